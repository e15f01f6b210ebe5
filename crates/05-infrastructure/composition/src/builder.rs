//! 自动装配构建器

use crate::autowire::Autowire;
use crate::error::BootstrapResult;
use crate::logging::{init_tracing, LoggingConfig};
use config_impl::{AutowireSettings, CacheBackend, SettingsLoader, SettingsValidator};
use di_abstractions::{
    CacheStore, ComponentFactory, FactoryRegistry, Injectable, SourceFileSystem, TypeRegistry,
};
use di_impl::{Container, FileCache, LocalFileSystem, MemoryCache, TypeGraph};
use infrastructure_common::GraphError;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 自动装配构建器
///
/// 按顺序组装：设置 → 文件系统 → 缓存 → 类型图 → 容器。
pub struct AutowireBuilder {
    settings: AutowireSettings,
    factories: FactoryRegistry,
    file_system: Option<Arc<dyn SourceFileSystem>>,
    cache: Option<Arc<dyn CacheStore>>,
    logging: Option<LoggingConfig>,
}

impl AutowireBuilder {
    /// 使用默认设置创建构建器
    pub fn new() -> Self {
        Self::from_settings(AutowireSettings::default())
    }

    /// 使用给定设置创建构建器
    pub fn from_settings(settings: AutowireSettings) -> Self {
        Self {
            settings,
            factories: FactoryRegistry::new(),
            file_system: None,
            cache: None,
            logging: None,
        }
    }

    /// 通过加载器读取设置
    pub fn from_loader(loader: &SettingsLoader) -> BootstrapResult<Self> {
        Ok(Self::from_settings(loader.load()?))
    }

    /// 当前设置
    pub fn settings(&self) -> &AutowireSettings {
        &self.settings
    }

    /// 追加扫描路径
    pub fn add_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.scanner.paths.push(path.into());
        self
    }

    /// 替换源文件系统（默认访问本地磁盘）
    pub fn with_file_system(mut self, file_system: Arc<dyn SourceFileSystem>) -> Self {
        self.file_system = Some(file_system);
        self
    }

    /// 替换缓存（默认由设置中的缓存后端决定）
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 构建时初始化日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 注册组件工厂
    pub fn register_factory(mut self, factory: ComponentFactory) -> Self {
        debug!("注册组件工厂: {}", factory.type_name());
        self.factories.register(factory);
        self
    }

    /// 注册可注入类型
    pub fn register<T: Injectable>(self) -> Self {
        self.register_factory(T::factory())
    }

    fn cache_store(&self) -> Arc<dyn CacheStore> {
        if let Some(cache) = &self.cache {
            return Arc::clone(cache);
        }
        match self.settings.cache.backend {
            CacheBackend::File => Arc::new(FileCache::new(&self.settings.cache.directory)),
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
        }
    }

    fn source_file_system(&self) -> Arc<dyn SourceFileSystem> {
        self.file_system.clone().unwrap_or_else(|| {
            Arc::new(LocalFileSystem::new().with_follow_links(self.settings.scanner.follow_links))
        })
    }

    /// 构建自动装配核心
    ///
    /// 单个文件扫描失败只记录警告，其余文件照常注册。
    pub fn build(mut self) -> BootstrapResult<Autowire> {
        if let Some(logging) = &self.logging {
            if let Err(err) = init_tracing(logging) {
                debug!("跳过日志初始化: {}", err);
            }
        }

        self.settings.normalize();
        SettingsValidator::validate(&self.settings).into_result()?;

        let mut graph = TypeGraph::builder()
            .with_name(self.settings.cache.name.clone())
            .with_scan_options(self.settings.scanner.scan_options())
            .with_file_system(self.source_file_system())
            .with_cache(self.cache_store())
            .build();

        for path in &self.settings.scanner.paths {
            match graph.add_path(path) {
                Ok(added) => info!("注册扫描路径 {}: 新增 {} 个类型", path.display(), added),
                Err(GraphError::ScanFailures { registered, failures }) => {
                    warn!(
                        "扫描路径 {} 时有 {} 个文件失败，已注册 {} 个类型",
                        path.display(),
                        failures.len(),
                        registered
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        let graph = Arc::new(RwLock::new(graph));
        let container = Container::new(graph.clone())
            .with_config(self.settings.container.clone())
            .with_parameters(self.settings.parameters.clone())
            .with_factories(self.factories);

        info!(
            "自动装配核心就绪: {} 个类型, {} 个组件工厂",
            graph.read().len(),
            container.stats().registered_factories
        );
        Ok(Autowire::new(graph, Arc::new(container), self.settings))
    }
}

impl Default for AutowireBuilder {
    fn default() -> Self {
        Self::new()
    }
}
