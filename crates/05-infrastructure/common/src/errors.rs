//! 错误类型定义

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },
}

/// 源文件扫描错误
///
/// 单个文件无法扫描的原因：格式有问题或内容无法读取。空文件不是错误，而是零个声明。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("第 {line} 行的 {construct} 语句在文件结束前没有终止")]
    Unterminated { construct: &'static str, line: usize },

    #[error("第 {line} 行期望 {expected}，实际为 `{found}`")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        line: usize,
    },

    #[error("文件无法读取: {message}")]
    Unreadable { message: String },
}

/// 解析歧义时的候选类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 候选类型的限定名
    pub name: String,
    /// 声明该类型的源文件
    pub source_path: PathBuf,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.source_path.display())
    }
}

fn join_candidates(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_failures(failures: &[(PathBuf, ScanError)]) -> String {
    failures
        .iter()
        .map(|(path, err)| format!("{}: {}", path.display(), err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 类型图错误
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("扫描文件失败: {path}, 原因: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: ScanError,
    },

    #[error("部分文件扫描失败 (已注册 {registered} 个类型): {}", join_failures(.failures))]
    ScanFailures {
        registered: usize,
        failures: Vec<(PathBuf, ScanError)>,
    },

    #[error("类型 {type_name} 存在多个具体实现: {}", join_candidates(.candidates))]
    AmbiguousResolution {
        type_name: String,
        candidates: Vec<Candidate>,
    },

    #[error("未知类型: {type_name}")]
    UnknownType { type_name: String },

    #[error("类型记录已过期: {type_name} ({})", .path.display())]
    StaleRecord { type_name: String, path: PathBuf },

    #[error("检测到循环继承: {chain}")]
    CircularInheritance { chain: String },

    #[error("文件系统访问失败: {}, 原因: {message}", .path.display())]
    FileSystem { path: PathBuf, message: String },

    #[error("缓存访问失败: {message}")]
    Cache { message: String },

    #[error("类型图状态序列化失败: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl GraphError {
    /// 是否应该触发一次完整重载后重试
    pub fn triggers_reload(&self) -> bool {
        matches!(self, Self::UnknownType { .. } | Self::StaleRecord { .. })
    }

    pub fn unknown(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }

    pub fn file_system(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::FileSystem {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn cache(message: impl fmt::Display) -> Self {
        Self::Cache {
            message: message.to_string(),
        }
    }
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("无法满足依赖: {declaring_type}::{method} 的参数 `{parameter}`{}", .source.as_ref().map(|e| format!(", 原因: {e}")).unwrap_or_default())]
    UnsatisfiedDependency {
        declaring_type: String,
        method: String,
        parameter: String,
        #[source]
        source: Option<Box<DependencyError>>,
    },

    /// 类型图错误原样向上传播
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("类型 {type_name} 没有可用的构造器")]
    NoConstructor { type_name: String },

    #[error("类型 {type_name} 不可实例化（抽象类型或接口）")]
    NotInstantiable { type_name: String },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("类型 {type_name} 不存在方法 {method}")]
    MethodNotFound { type_name: String, method: String },

    #[error("参数 `{parameter}` 类型不匹配: 期望 {expected}, 实际 {found}")]
    ArgumentMismatch {
        parameter: String,
        expected: String,
        found: String,
    },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DependencyError {
    /// 创建参数无法满足的错误
    pub fn unsatisfied(
        declaring_type: impl Into<String>,
        method: impl Into<String>,
        parameter: impl Into<String>,
    ) -> Self {
        Self::UnsatisfiedDependency {
            declaring_type: declaring_type.into(),
            method: method.into(),
            parameter: parameter.into(),
            source: None,
        }
    }

    /// 创建组件创建失败错误
    pub fn creation_failed(
        type_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 是否由类型图产生
    pub fn is_graph_error(&self) -> bool {
        matches!(self, Self::Graph(_))
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ScanResult<T> = Result<T, ScanError>;
pub type GraphResult<T> = Result<T, GraphError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
