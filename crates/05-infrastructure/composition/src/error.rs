//! 启动错误

use infrastructure_common::{ConfigError, DependencyError, GraphError};
use thiserror::Error;

/// 组装自动装配核心时的错误
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("设置无效: {0}")]
    Config(#[from] ConfigError),

    #[error("类型图初始化失败: {0}")]
    Graph(#[from] GraphError),

    #[error("容器初始化失败: {0}")]
    Dependency(#[from] DependencyError),

    #[error("日志初始化失败: {message}")]
    Logging { message: String },
}

/// 启动结果
pub type BootstrapResult<T> = Result<T, BootstrapError>;
