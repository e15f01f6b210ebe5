//! 元数据定义
//!
//! 扫描器产出的声明信息、类型图持有的类型记录以及扫描单元

use crate::conventions::NamingConventions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 单个类型声明（扫描器输出）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationInfo {
    /// 限定名（不带前导分隔符）
    pub name: String,
    /// 声明的父类型
    pub extends: Vec<String>,
    /// 声明实现的接口
    pub implements: Vec<String>,
    /// 是否可直接实例化
    pub instantiable: bool,
    /// 声明所在行（从 1 开始）
    pub line: usize,
}

impl DeclarationInfo {
    /// 创建新的声明信息
    pub fn new(name: impl Into<String>, instantiable: bool) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
            implements: Vec::new(),
            instantiable,
            line: 0,
        }
    }

    /// 添加父类型
    pub fn with_extends(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    /// 添加接口
    pub fn with_implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    /// 父类型在前、接口在后的有序去重列表
    pub fn parents(&self) -> Vec<String> {
        let mut parents: Vec<String> = Vec::new();
        for parent in self.extends.iter().chain(self.implements.iter()) {
            if !parents.iter().any(|p| NamingConventions::same_type(p, parent)) {
                parents.push(parent.clone());
            }
        }
        parents
    }
}

/// 类型图中的类型记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRecord {
    /// 限定名
    pub qualified_name: String,
    /// 规范化查找键
    pub key: String,
    /// 声明所在文件
    pub source_path: PathBuf,
    /// 声明文件的内容哈希
    pub content_hash: String,
    /// 父类型与接口（父类型在前）
    pub parents: Vec<String>,
    /// 是否可实例化
    pub instantiable: bool,
    /// 记忆化的后代解析结果
    pub resolved_descendant: Option<String>,
    /// 附加信息
    pub extra_info: HashMap<String, serde_json::Value>,
}

impl TypeRecord {
    /// 从声明信息创建记录
    pub fn from_declaration(
        declaration: &DeclarationInfo,
        source_path: impl Into<PathBuf>,
        content_hash: impl Into<String>,
    ) -> Self {
        let qualified_name = NamingConventions::canonical_name(&declaration.name);
        Self {
            key: NamingConventions::normalize_key(&qualified_name),
            qualified_name,
            source_path: source_path.into(),
            content_hash: content_hash.into(),
            parents: declaration.parents(),
            instantiable: declaration.instantiable,
            resolved_descendant: None,
            extra_info: HashMap::new(),
        }
    }

    /// 父类型的规范化键
    pub fn parent_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.parents
            .iter()
            .map(|parent| NamingConventions::normalize_key(parent))
    }

    /// 合并附加信息，已有但未出现在 `info` 中的键保留
    pub fn annotate(&mut self, info: HashMap<String, serde_json::Value>) {
        self.extra_info.extend(info);
    }
}

/// 扫描单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanUnitKind {
    File,
    Directory,
}

/// 已扫描过的文件或目录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanUnit {
    /// 路径
    pub path: PathBuf,
    /// 类型
    pub kind: ScanUnitKind,
    /// 变更签名：目录为直接子项数量，文件为内容哈希
    pub signature: String,
}

impl ScanUnit {
    /// 创建文件扫描单元
    pub fn file(path: impl Into<PathBuf>, content_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ScanUnitKind::File,
            signature: content_hash.into(),
        }
    }

    /// 创建目录扫描单元
    pub fn directory(path: impl Into<PathBuf>, child_count: usize) -> Self {
        Self {
            path: path.into(),
            kind: ScanUnitKind::Directory,
            signature: child_count.to_string(),
        }
    }

    /// 该单元是否覆盖给定路径（目录包含或文件相同）
    pub fn covers(&self, path: &std::path::Path) -> bool {
        match self.kind {
            ScanUnitKind::Directory => path.starts_with(&self.path),
            ScanUnitKind::File => path == self.path,
        }
    }
}
