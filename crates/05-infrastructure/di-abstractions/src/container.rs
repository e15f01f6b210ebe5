//! 依赖注入容器抽象接口
//!
//! 容器按名称向类型注册表询问具体类型，再通过组件工厂的构造描述符
//! 递归填充参数，得到完整装配的实例。

use infrastructure_common::{
    Argument, BoxedComponent, DependencyResult, Instance, Parameters,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 前置过滤器：构造前变换参数
pub type PreCreateFilter = Arc<dyn Fn(Parameters) -> Parameters + Send + Sync>;

/// 后置过滤器：构造完成、冻结前变换对象
pub type PostCreateFilter =
    Arc<dyn Fn(BoxedComponent) -> DependencyResult<BoxedComponent> + Send + Sync>;

/// 过滤钩子
#[derive(Clone)]
pub enum FilterHook {
    /// 构造前执行，接收并返回构造参数
    PreCreate(PreCreateFilter),
    /// 构造后执行，接收并返回对象
    PostCreate(PostCreateFilter),
}

impl FilterHook {
    /// 钩子阶段名称
    pub fn stage(&self) -> &'static str {
        match self {
            Self::PreCreate(_) => "on_create",
            Self::PostCreate(_) => "on_created",
        }
    }
}

impl fmt::Debug for FilterHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FilterHook").field(&self.stage()).finish()
    }
}

/// 依赖注入容器 trait
pub trait DiContainer: Send + Sync {
    /// 是否已有该名称的实例
    fn has_instance(&self, name: &str) -> bool;

    /// 保存实例：同时登记在该名称和实例具体类型的全部祖先名称下
    fn set_instance(&self, name: &str, instance: Instance) -> DependencyResult<()>;

    /// 获取实例，不存在时构造并记忆化
    fn get_instance(&self, name: &str, params: Parameters) -> DependencyResult<Instance>;

    /// 总是构造新的实例，不记忆化
    fn create_instance(&self, name: &str, params: Parameters) -> DependencyResult<Instance>;

    /// 以相同的参数解析规则调用已有实例上的方法
    fn call_method(
        &self,
        instance: &Instance,
        method: &str,
        params: Parameters,
    ) -> DependencyResult<Argument>;

    /// 注册前置过滤器
    fn on_create(&self, name: &str, filter: PreCreateFilter);

    /// 注册后置过滤器
    fn on_created(&self, name: &str, filter: PostCreateFilter);
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// setter 方法名前缀
    pub setter_prefix: String,
    /// 是否启用 setter 注入
    pub enable_setter_injection: bool,
    /// 首次构造时是否把依赖列表写回类型记录
    pub annotate_dependencies: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 64,
            setter_prefix: "set".to_string(),
            enable_setter_injection: true,
            annotate_dependencies: true,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 已注册工厂数量
    pub registered_factories: usize,
    /// 记忆化的实例键数量
    pub active_instances: usize,
    /// 累计构造的实例数量
    pub created_instances: usize,
    /// 记忆化命中次数
    pub memo_hits: usize,
    /// 被跳过的 setter 注入次数
    pub skipped_setters: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: ContainerConfig =
            serde_json::from_value(serde_json::json!({ "setter_prefix": "with" })).unwrap();
        assert_eq!(config.setter_prefix, "with");
        assert_eq!(config.max_resolution_depth, 64);
        assert!(config.enable_setter_injection);
    }

    #[test]
    fn hook_stage_names() {
        let pre = FilterHook::PreCreate(Arc::new(|params: Parameters| params));
        let post = FilterHook::PostCreate(Arc::new(|component: BoxedComponent| {
            Ok::<_, infrastructure_common::DependencyError>(component)
        }));
        assert_eq!(pre.stage(), "on_create");
        assert_eq!(format!("{post:?}"), "FilterHook(\"on_created\")");
    }
}
