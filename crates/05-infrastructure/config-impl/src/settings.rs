//! 自动装配设置

use di_abstractions::{normalize_extension, ContainerConfig, ScanOptions};
use infrastructure_common::{ConfigError, ConfigResult, ConfigSection};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// 自动装配的完整设置
///
/// ```toml
/// [scanner]
/// extensions = ["php"]
/// paths = ["src"]
///
/// [cache]
/// backend = "file"
/// directory = ".autowire/cache"
/// name = "default"
///
/// [container]
/// max_resolution_depth = 64
/// setter_prefix = "set"
///
/// [parameters]
/// db_host = "localhost"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutowireSettings {
    /// 扫描设置
    pub scanner: ScannerSettings,
    /// 类型图缓存设置
    pub cache: CacheSettings,
    /// 容器设置
    pub container: ContainerConfig,
    /// 容器配置存储，基础类型参数按参数名从中取值
    pub parameters: ConfigSection,
}

impl AutowireSettings {
    /// 规范化扩展名：去掉前导点、转小写、去重
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.scanner.extensions = self
            .scanner
            .extensions
            .iter()
            .map(|extension| normalize_extension(extension))
            .filter(|extension| seen.insert(extension.clone()))
            .collect();
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })
    }
}

/// 扫描设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// 源文件扩展名白名单（不区分大小写）
    pub extensions: Vec<String>,
    /// 启动时注册的目录或文件
    pub paths: Vec<PathBuf>,
    /// 是否跟随符号链接
    pub follow_links: bool,
}

impl ScannerSettings {
    /// 转换为扫描选项
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            follow_links: self.follow_links,
            ..ScanOptions::with_extensions(&self.extensions)
        }
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            extensions: vec!["php".to_string()],
            paths: Vec::new(),
            follow_links: false,
        }
    }
}

/// 缓存后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// 每个键一个文件
    #[default]
    File,
    /// 进程内缓存，进程退出即丢失
    Memory,
}

/// 类型图缓存设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// 缓存后端
    pub backend: CacheBackend,
    /// 文件缓存目录
    pub directory: PathBuf,
    /// 类型图名称，缓存键为 `autowire.type_graph.<name>`
    pub name: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::File,
            directory: PathBuf::from(".autowire/cache"),
            name: "default".to_string(),
        }
    }
}
