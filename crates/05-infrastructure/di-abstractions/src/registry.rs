//! 类型注册表抽象接口
//!
//! [`TypeRegistry`] 是类型图对外暴露的查询面：登记源文件、查询类型是否存在、
//! 解析抽象类型唯一的具体实现。[`FactoryRegistry`] 则按规范化名称保存组件工厂，
//! 容器据此把类型名变成真正的对象。

use crate::factory::{ComponentFactory, Injectable};
use infrastructure_common::{GraphResult, NamingConventions, TypeRecord};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// 类型注册表 trait
///
/// 所有名称参数都不区分大小写，前导分隔符可有可无。
pub trait TypeRegistry: Send + Sync {
    /// 递归扫描目录，返回新注册的记录数
    fn add_path(&mut self, path: &Path) -> GraphResult<usize>;

    /// 扫描单个文件，返回新注册的记录数
    fn add_file(&mut self, path: &Path) -> GraphResult<usize>;

    /// 是否存在该类型的记录
    fn has_type(&self, name: &str) -> bool;

    /// 解析唯一的具体后代类型
    fn find_concrete_type(&mut self, name: &str) -> GraphResult<String>;

    /// 收集全部可实例化的后代类型，过滤掉 `excluding` 中的名称
    fn find_all_concrete_types(&mut self, name: &str, excluding: &[&str]) -> GraphResult<Vec<String>>;

    /// `child` 是否直接或间接继承/实现 `parent`（相同类型也返回 true）
    fn is_descendant_of(&self, child: &str, parent: &str) -> bool;

    /// 全部祖先类型与接口的限定名（不含自身）
    fn ancestors(&self, name: &str) -> Vec<String>;

    /// 获取记录快照
    fn record(&self, name: &str) -> Option<TypeRecord>;

    /// 合并附加信息到记录
    fn annotate(&mut self, name: &str, info: HashMap<String, serde_json::Value>) -> GraphResult<()>;

    /// 清空派生状态并重新扫描所有已登记的文件和目录
    fn reload(&mut self) -> GraphResult<usize>;

    /// 已知类型的限定名，按名称排序
    fn type_names(&self) -> Vec<String>;

    /// 记录数量
    fn len(&self) -> usize;

    /// 是否没有任何记录
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 组件工厂注册表
#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<ComponentFactory>>,
}

impl FactoryRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工厂，同名工厂会被替换，返回被替换的旧工厂
    pub fn register(&mut self, factory: ComponentFactory) -> Option<Arc<ComponentFactory>> {
        let key = NamingConventions::normalize_key(factory.type_name());
        self.factories.insert(key, Arc::new(factory))
    }

    /// 注册可注入类型
    pub fn register_injectable<T: Injectable>(&mut self) -> Option<Arc<ComponentFactory>> {
        self.register(T::factory())
    }

    /// 按名称获取工厂
    pub fn get(&self, name: &str) -> Option<Arc<ComponentFactory>> {
        self.factories
            .get(&NamingConventions::normalize_key(name))
            .cloned()
    }

    /// 是否注册了该名称的工厂
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .contains_key(&NamingConventions::normalize_key(name))
    }

    /// 工厂数量
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// 已注册的限定名，按名称排序
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .values()
            .map(|factory| factory.type_name().to_string())
            .collect();
        names.sort();
        names
    }
}
