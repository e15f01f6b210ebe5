//! 设置验证

use crate::settings::{AutowireSettings, CacheBackend};
use infrastructure_common::{ConfigError, ConfigResult};
use tracing::{debug, warn};

/// 验证结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// 错误（字段路径, 描述）
    pub errors: Vec<(String, String)>,
    /// 警告（字段路径, 描述）
    pub warnings: Vec<(String, String)>,
}

impl ValidationReport {
    /// 是否通过
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push((field.to_string(), message.into()));
    }

    fn warning(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push((field.to_string(), message.into()));
    }

    /// 有错误时转换为 [`ConfigError::ValidationError`]
    pub fn into_result(self) -> ConfigResult<()> {
        for (field, message) in &self.warnings {
            warn!("配置警告 {}: {}", field, message);
        }
        if self.is_valid() {
            return Ok(());
        }
        let message = self
            .errors
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::ValidationError { message })
    }
}

/// 设置验证器
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsValidator;

impl SettingsValidator {
    /// 检查设置，收集全部问题
    pub fn validate(settings: &AutowireSettings) -> ValidationReport {
        let mut report = ValidationReport::default();

        if settings.scanner.extensions.is_empty() {
            report.error("scanner.extensions", "至少需要一个扩展名");
        }
        for extension in &settings.scanner.extensions {
            if extension.is_empty() {
                report.error("scanner.extensions", "扩展名不能为空");
            } else if extension.starts_with('.') {
                report.error("scanner.extensions", format!("扩展名 `{extension}` 不能以点开头"));
            }
        }
        if settings.scanner.paths.is_empty() {
            report.warning("scanner.paths", "未配置扫描路径，类型图初始为空");
        }

        if settings.cache.name.trim().is_empty() {
            report.error("cache.name", "类型图名称不能为空");
        }
        if settings.cache.backend == CacheBackend::File
            && settings.cache.directory.as_os_str().is_empty()
        {
            report.error("cache.directory", "文件缓存需要目录");
        }

        if settings.container.max_resolution_depth == 0 {
            report.error("container.max_resolution_depth", "必须大于 0");
        }
        if settings.container.setter_prefix.is_empty() {
            report.error("container.setter_prefix", "setter 前缀不能为空");
        }

        debug!(
            "设置验证完成: {} 个错误, {} 个警告",
            report.errors.len(),
            report.warnings.len()
        );
        report
    }
}
