//! 派生宏生成的工厂在容器中的行为

use component_macros::Injectable;
use di_abstractions::{DiContainer, Injectable, TypeRegistry};
use di_impl::{Container, MemoryFileSystem, TypeGraph};
use infrastructure_common::{ConfigSection, DependencyError, Parameters};
use parking_lot::RwLock;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

trait Logger: Send + Sync {
    fn target(&self) -> String;
}

#[derive(Injectable)]
#[injectable(name = "App\\FileLogger", expose = "dyn Logger")]
struct FileLogger {
    #[inject(default = "/var/log/app.log")]
    path: String,
}

impl Logger for FileLogger {
    fn target(&self) -> String {
        self.path.clone()
    }
}

#[derive(Injectable)]
#[injectable(name = "App\\SystemClock")]
struct SystemClock;

#[derive(Injectable)]
#[injectable(name = "App\\SmtpMailer")]
struct SmtpMailer {
    #[inject(ty = "App\\Logger")]
    logger: Arc<dyn Logger>,
    host: String,
    #[inject(default = 25)]
    port: i64,
    #[inject(ty = "App\\Audit")]
    audit: Option<Arc<dyn Logger>>,
    #[inject(setter, ty = "App\\Clock")]
    clock: Option<Arc<SystemClock>>,
    #[inject(skip)]
    sent: u64,
}

#[derive(Injectable)]
#[injectable(name = "App\\Pipeline")]
struct Pipeline {
    first: String,
    #[inject(collection)]
    rest: Vec<String>,
}

fn container(with_clock: bool) -> Container {
    let fs = MemoryFileSystem::new()
        .with_file("/src/Logger.php", "<?php namespace App; interface Logger {}")
        .with_file(
            "/src/FileLogger.php",
            "<?php namespace App; class FileLogger implements Logger {}",
        )
        .with_file("/src/Audit.php", "<?php namespace App; interface Audit {}")
        .with_file("/src/Clock.php", "<?php namespace App; interface Clock {}")
        .with_file("/src/SmtpMailer.php", "<?php namespace App; class SmtpMailer {}")
        .with_file("/src/Pipeline.php", "<?php namespace App; class Pipeline {}");
    let fs = if with_clock {
        fs.with_file(
            "/src/SystemClock.php",
            "<?php namespace App; final class SystemClock implements Clock {}",
        )
    } else {
        fs
    };

    let mut graph = TypeGraph::builder()
        .with_name("macros")
        .with_file_system(Arc::new(fs))
        .build();
    graph.add_path(Path::new("/src")).unwrap();

    let container = Container::new(Arc::new(RwLock::new(graph)))
        .with_parameters(ConfigSection::new().with("host", json!("smtp.local")));
    container.register::<FileLogger>();
    container.register::<SystemClock>();
    container.register::<SmtpMailer>();
    container.register::<Pipeline>();
    container
}

#[test]
fn test_derived_factory_describes_fields() {
    let factory = SmtpMailer::factory();
    assert_eq!(factory.type_name(), "App\\SmtpMailer");

    let names: Vec<_> = factory
        .constructor()
        .params
        .iter()
        .map(|param| param.name.as_str())
        .collect();
    assert_eq!(names, vec!["logger", "host", "port", "audit"]);
    assert_eq!(
        factory.constructor().object_dependencies(),
        vec!["App\\Logger".to_string(), "App\\Audit".to_string()]
    );
    assert!(factory.method("set_clock").is_some());
    assert_eq!(factory.setters("set").count(), 1);
}

#[test]
fn test_constructor_fields_are_autowired() {
    let container = container(true);
    let mailer = container.get::<SmtpMailer>("App\\SmtpMailer").unwrap();

    assert_eq!(mailer.logger.target(), "/var/log/app.log");
    assert_eq!(mailer.host, "smtp.local");
    assert_eq!(mailer.port, 25);
    assert!(mailer.audit.is_none());
    assert_eq!(mailer.sent, 0);
    assert!(mailer.clock.is_some());
}

#[test]
fn test_unresolvable_setter_is_skipped() {
    let container = container(false);
    let mailer = container.get::<SmtpMailer>("App\\SmtpMailer").unwrap();

    assert!(mailer.clock.is_none());
    assert_eq!(container.stats().skipped_setters, 1);
}

#[test]
fn test_exposed_view_satisfies_interface() {
    let container = container(true);
    let logger = container.get::<dyn Logger>("App\\Logger").unwrap();
    assert_eq!(logger.target(), "/var/log/app.log");

    let concrete = container.get::<FileLogger>("App\\FileLogger").unwrap();
    assert_eq!(concrete.path, "/var/log/app.log");
}

#[test]
fn test_collection_field_takes_remaining_arguments() {
    let container = container(true);
    let pipeline = container
        .create_instance("App\\Pipeline", Parameters::positional(["lint", "test", "deploy"]))
        .unwrap()
        .cast::<Pipeline>()
        .unwrap();

    assert_eq!(pipeline.first, "lint");
    assert_eq!(pipeline.rest, vec!["test".to_string(), "deploy".to_string()]);
}

#[test]
fn test_missing_value_is_reported_with_field_name() {
    let container = container(true);
    let err = container
        .create_instance("App\\Pipeline", Parameters::new())
        .err()
        .unwrap();

    match err {
        DependencyError::UnsatisfiedDependency {
            declaring_type,
            parameter,
            ..
        } => {
            assert_eq!(declaring_type, "App\\Pipeline");
            assert_eq!(parameter, "first");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_named_arguments_override_configuration() {
    let container = container(true);
    let mailer = container
        .create_instance(
            "App\\SmtpMailer",
            Parameters::new().named("host", "mail.example.org").named("port", 587_i64),
        )
        .unwrap()
        .cast::<SmtpMailer>()
        .unwrap();

    assert_eq!(mailer.host, "mail.example.org");
    assert_eq!(mailer.port, 587);
    assert!(container.registry().read().has_type("App\\SmtpMailer"));
}
