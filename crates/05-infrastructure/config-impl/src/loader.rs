//! 设置加载器
//!
//! 依次叠加配置文件、环境变量和显式覆盖项，后者优先。
//! 环境变量形如 `AUTOWIRE__CACHE__BACKEND=memory`，列表值用逗号分隔：
//! `AUTOWIRE__SCANNER__EXTENSIONS=php,inc`。

use crate::settings::AutowireSettings;
use crate::validation::SettingsValidator;
use config::{Config, Environment, File};
use infrastructure_common::{ConfigError, ConfigResult};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "AUTOWIRE";

/// 默认环境变量层级分隔符
pub const DEFAULT_ENV_SEPARATOR: &str = "__";

/// 以列表解析的环境变量键
const LIST_KEYS: [&str; 2] = ["scanner.extensions", "scanner.paths"];

/// 设置加载器
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    files: Vec<(PathBuf, bool)>,
    env_prefix: Option<String>,
    env_separator: String,
    overrides: Vec<(String, String)>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
            env_separator: DEFAULT_ENV_SEPARATOR.to_string(),
            overrides: Vec::new(),
        }
    }
}

impl SettingsLoader {
    /// 创建加载器，默认读取 `AUTOWIRE` 前缀的环境变量
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加必需的配置文件，格式由扩展名决定
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push((path.into(), true));
        self
    }

    /// 添加可选的配置文件
    pub fn with_optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push((path.into(), false));
        self
    }

    /// 设置环境变量前缀
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// 不读取环境变量
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// 设置环境变量层级分隔符
    pub fn with_env_separator(mut self, separator: impl Into<String>) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// 覆盖单个键，例如 `cache.backend`
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// 加载、规范化并验证设置
    pub fn load(&self) -> ConfigResult<AutowireSettings> {
        let mut builder = Config::builder();

        for (path, required) in &self.files {
            if *required && !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("添加配置文件: {}", path.display());
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }

        if let Some(prefix) = &self.env_prefix {
            let environment = LIST_KEYS.iter().fold(
                Environment::with_prefix(prefix)
                    .separator(&self.env_separator)
                    .try_parsing(true)
                    .list_separator(","),
                |environment, key| environment.with_list_parse_key(key),
            );
            builder = builder.add_source(environment);
        }

        for (key, value) in &self.overrides {
            builder = builder
                .set_override(key.as_str(), value.as_str())
                .map_err(parse_error)?;
        }

        let mut settings: AutowireSettings = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| {
                error!("设置加载失败: {}", e);
                parse_error(e)
            })?;

        settings.normalize();
        SettingsValidator::validate(&settings).into_result()?;

        info!(
            "设置加载完成: {} 个扫描路径, 缓存后端 {:?}",
            settings.scanner.paths.len(),
            settings.cache.backend
        );
        Ok(settings)
    }
}

fn parse_error(error: config::ConfigError) -> ConfigError {
    ConfigError::ParseError {
        source: Box::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CacheBackend;
    use serde_json::json;
    use std::path::Path;

    const SAMPLE: &str = r#"
[scanner]
extensions = [".PHP", "inc"]
paths = ["src", "lib"]

[cache]
backend = "memory"
name = "app"

[container]
max_resolution_depth = 16

[parameters]
db_host = "localhost"
db_port = 5432
"#;

    fn sample_file(dir: &Path) -> PathBuf {
        let path = dir.join("autowire.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsLoader::new()
            .without_env()
            .with_file(sample_file(dir.path()))
            .load()
            .unwrap();

        assert_eq!(settings.scanner.extensions, vec!["php", "inc"]);
        assert_eq!(settings.scanner.paths, vec![PathBuf::from("src"), PathBuf::from("lib")]);
        assert_eq!(settings.cache.backend, CacheBackend::Memory);
        assert_eq!(settings.cache.name, "app");
        assert_eq!(settings.container.max_resolution_depth, 16);
        assert_eq!(settings.container.setter_prefix, "set");
        assert_eq!(settings.parameters.get("db_port"), Some(&json!(5432)));
    }

    #[test]
    fn missing_required_file_is_reported() {
        let err = SettingsLoader::new()
            .without_env()
            .with_file("/definitely/not/here.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let settings = SettingsLoader::new()
            .without_env()
            .with_optional_file("/definitely/not/here.toml")
            .load()
            .unwrap();
        assert_eq!(settings, {
            let mut defaults = AutowireSettings::default();
            defaults.normalize();
            defaults
        });
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("AUTOWIRE_LOADER_TEST__CACHE__NAME", "from-env");
        std::env::set_var("AUTOWIRE_LOADER_TEST__SCANNER__EXTENSIONS", "php,phtml");
        std::env::set_var("AUTOWIRE_LOADER_TEST__PARAMETERS__DB_HOST", "db.internal");

        let settings = SettingsLoader::new()
            .with_env_prefix("AUTOWIRE_LOADER_TEST")
            .with_file(sample_file(dir.path()))
            .load()
            .unwrap();

        assert_eq!(settings.cache.name, "from-env");
        assert_eq!(settings.scanner.extensions, vec!["php", "phtml"]);
        assert_eq!(settings.parameters.get("db_host"), Some(&json!("db.internal")));
        assert_eq!(settings.parameters.get("db_port"), Some(&json!(5432)));
    }

    #[test]
    fn overrides_win_and_are_validated() {
        let settings = SettingsLoader::new()
            .without_env()
            .with_override("cache.backend", "memory")
            .load()
            .unwrap();
        assert_eq!(settings.cache.backend, CacheBackend::Memory);

        let err = SettingsLoader::new()
            .without_env()
            .with_override("container.max_resolution_depth", "0")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
