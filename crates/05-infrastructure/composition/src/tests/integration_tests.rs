//! 构建器集成测试

use crate::{AutowireBuilder, BootstrapError, LoggingConfig};
use config_impl::{AutowireSettings, CacheBackend};
use di_abstractions::{ComponentFactory, DiContainer, ParamDescriptor, TypeRegistry};
use di_impl::{MemoryCache, MemoryFileSystem};
use infrastructure_common::{ConfigError, GraphError, Parameters};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

struct Repository {
    dsn: String,
}

fn sources() -> Arc<MemoryFileSystem> {
    Arc::new(
        MemoryFileSystem::new()
            .with_file(
                "/app/src/Repository.php",
                "<?php namespace App; interface Repository {}",
            )
            .with_file(
                "/app/src/SqlRepository.php",
                "<?php namespace App; class SqlRepository implements Repository {}",
            )
            .with_file("/app/src/Broken.php", "<?php namespace App; class Broken {"),
    )
}

fn settings() -> AutowireSettings {
    let mut settings = AutowireSettings::default();
    settings.scanner.paths = vec![PathBuf::from("/app/src")];
    settings.cache.backend = CacheBackend::Memory;
    settings.parameters.insert("dsn", json!("sqlite::memory:"));
    settings
}

fn repository_factory() -> ComponentFactory {
    ComponentFactory::builder::<Repository>("App\\SqlRepository")
        .param(ParamDescriptor::value("dsn", "string"))
        .constructor(|args| Ok(Repository { dsn: args.get(0)? }))
        .build()
}

/// 扫描失败的文件不影响其余文件，配置存储传入容器
#[test]
fn test_builder_wires_graph_and_container() {
    let autowire = AutowireBuilder::from_settings(settings())
        .with_file_system(sources())
        .with_logging(LoggingConfig::default().with_level("debug"))
        .register_factory(repository_factory())
        .build()
        .unwrap();

    assert_eq!(autowire.graph().read().len(), 2);
    assert_eq!(autowire.find_concrete_type("App\\Repository").unwrap(), "App\\SqlRepository");

    let repository = autowire.get::<Repository>("App\\Repository").unwrap();
    assert_eq!(repository.dsn, "sqlite::memory:");
    assert!(autowire.container().has_instance("App\\SqlRepository"));

    let created = autowire
        .container()
        .create_instance("App\\Repository", Parameters::new().named("dsn", "postgres://"))
        .unwrap();
    assert_eq!(created.cast::<Repository>().unwrap().dsn, "postgres://");
}

/// 同一个缓存上的第二次构建直接恢复类型图
#[test]
fn test_shared_cache_restores_graph() {
    let cache = Arc::new(MemoryCache::new());
    let fs = sources();

    AutowireBuilder::from_settings(settings())
        .with_file_system(fs.clone())
        .with_cache(cache.clone())
        .build()
        .unwrap()
        .flush()
        .unwrap();
    assert_eq!(cache.len(), 1);

    let mut restored = settings();
    restored.scanner.paths.clear();
    let autowire = AutowireBuilder::from_settings(restored)
        .with_file_system(fs)
        .with_cache(cache)
        .build()
        .unwrap();
    assert!(autowire.graph().read().has_type("App\\Repository"));
}

/// 运行期添加路径后新类型立即可解析
#[test]
fn test_runtime_paths_and_reload() {
    let fs = sources();
    let autowire = AutowireBuilder::from_settings(settings())
        .with_file_system(fs.clone())
        .build()
        .unwrap();

    fs.insert(
        "/app/plugins/AuditLog.php",
        "<?php namespace Plugins; final class AuditLog {}",
    );
    assert_eq!(autowire.add_path("/app/plugins").unwrap(), 1);
    assert_eq!(autowire.find_concrete_type("Plugins\\AuditLog").unwrap(), "Plugins\\AuditLog");

    fs.remove("/app/plugins/AuditLog.php");
    match autowire.reload() {
        Err(GraphError::ScanFailures { registered, failures }) => {
            assert_eq!(registered, 2);
            assert_eq!(failures.len(), 1);
        }
        other => panic!("unexpected reload result: {other:?}"),
    }
    assert!(!autowire.graph().read().has_type("Plugins\\AuditLog"));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let mut invalid = settings();
    invalid.scanner.extensions.clear();

    let result = AutowireBuilder::from_settings(invalid)
        .with_file_system(sources())
        .build();
    assert!(matches!(
        result,
        Err(BootstrapError::Config(ConfigError::ValidationError { .. }))
    ));
}
