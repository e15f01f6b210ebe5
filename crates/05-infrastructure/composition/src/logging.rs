//! 日志初始化

use crate::error::{BootstrapError, BootstrapResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 默认过滤指令，`RUST_LOG` 存在时被其覆盖
    pub level: String,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示文件名和行号
    pub show_location: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_target: true,
            show_location: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 开发环境：debug 级别并显示代码位置
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            show_location: true,
            ..Self::default()
        }
    }

    /// 生产环境：JSON 输出
    pub fn production() -> Self {
        Self {
            show_target: false,
            json_format: true,
            ..Self::default()
        }
    }

    /// 指定默认级别
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// 安装全局 tracing 订阅者
///
/// 已经安装过订阅者时返回 [`BootstrapError::Logging`]，调用方可以忽略。
pub fn init_tracing(config: &LoggingConfig) -> BootstrapResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| BootstrapError::Logging {
            message: e.to_string(),
        })?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_file(config.show_location)
        .with_line_number(config.show_location);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| BootstrapError::Logging {
        message: e.to_string(),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}
