//! Centralized integration tests for di-impl crate
use di_abstractions::{
    ComponentFactory, DiContainer, ParamDescriptor, PostCreateFilter, PreCreateFilter,
    TypeRegistry,
};
use di_impl::{Container, FileCache, TypeGraph};
use infrastructure_common::{BoxedComponent, DependencyError, GraphError, Parameters};
use parking_lot::RwLock;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: impl AsRef<[u8]>) -> anyhow::Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// 两层接口，两个实现，一个模板文件
fn store_project() -> anyhow::Result<TempDir> {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("src");
    write(&src, "Contracts/Store.php", "<?php\nnamespace App\\Contracts;\n\ninterface Store {}\n")?;
    write(
        &src,
        "Contracts/CacheStore.php",
        "<?php\nnamespace App\\Contracts;\n\ninterface CacheStore extends Store {}\n",
    )?;
    write(&src, "Contracts/Clock.php", "<?php\nnamespace App\\Contracts;\n\ninterface Clock {}\n")?;
    write(
        &src,
        "Redis/RedisStore.php",
        "<?php\nnamespace App\\Redis;\n\nuse App\\Contracts\\CacheStore;\n\nclass RedisStore implements CacheStore {}\n",
    )?;
    write(
        &src,
        "Memory/ArrayStore.php",
        "<?php\nnamespace App\\Memory;\n\nuse App\\Contracts\\CacheStore;\n\nfinal class ArrayStore implements CacheStore {}\n",
    )?;
    write(
        &src,
        "Time/SystemClock.php",
        "<?php\nnamespace App\\Time;\n\nuse App\\Contracts\\Clock;\n\nclass SystemClock implements Clock {}\n",
    )?;
    write(
        &src,
        "templates/panel.phtml",
        "<?php\nnamespace App\\View;\n\nclass Panel {}\n",
    )?;
    Ok(dir)
}

fn graph_for(project: &TempDir) -> anyhow::Result<TypeGraph> {
    let mut graph = TypeGraph::builder()
        .with_name("stores")
        .with_cache(Arc::new(FileCache::new(project.path().join("cache"))))
        .build();
    graph.add_path(&project.path().join("src"))?;
    Ok(graph)
}

#[derive(Debug)]
struct RedisStore {
    prefix: String,
    clock: Arc<SystemClock>,
}

#[derive(Debug)]
struct SystemClock;

fn clock_factory() -> ComponentFactory {
    ComponentFactory::builder::<SystemClock>("App\\Time\\SystemClock")
        .constructor(|_| Ok(SystemClock))
        .build()
}

fn redis_factory(constructed: Arc<AtomicUsize>) -> ComponentFactory {
    ComponentFactory::builder::<RedisStore>("App\\Redis\\RedisStore")
        .param(ParamDescriptor::value("prefix", "string").with_default("app:"))
        .param(ParamDescriptor::object("clock", "App\\Contracts\\Clock"))
        .constructor(move |args| {
            constructed.fetch_add(1, Ordering::SeqCst);
            Ok(RedisStore {
                prefix: args.get(0)?,
                clock: args.get(1)?,
            })
        })
        .build()
}

fn container_for(graph: TypeGraph, constructed: Arc<AtomicUsize>) -> Container {
    let container = Container::new(Arc::new(RwLock::new(graph)));
    container.register_factory(clock_factory());
    container.register_factory(redis_factory(constructed));
    container
}

#[test]
fn test_interface_chain_resolves_to_all_leaves() -> anyhow::Result<()> {
    let project = store_project()?;
    let mut graph = graph_for(&project)?;

    assert!(graph.is_descendant_of("App\\Redis\\RedisStore", "App\\Contracts\\Store"));
    let ancestors = graph.ancestors("App\\Memory\\ArrayStore");
    assert!(ancestors.contains(&"App\\Contracts\\CacheStore".to_string()));
    assert!(ancestors.contains(&"App\\Contracts\\Store".to_string()));

    assert_eq!(
        graph.find_all_concrete_types("App\\Contracts\\Store", &[])?,
        vec!["App\\Memory\\ArrayStore".to_string(), "App\\Redis\\RedisStore".to_string()]
    );
    assert_eq!(
        graph.find_all_concrete_types("App\\Contracts\\Store", &["app\\memory\\arraystore"])?,
        vec!["App\\Redis\\RedisStore".to_string()]
    );
    assert!(matches!(
        graph.find_concrete_type("App\\Contracts\\CacheStore"),
        Err(GraphError::AmbiguousResolution { .. })
    ));
    assert_eq!(graph.find_concrete_type("App\\Contracts\\Clock")?, "App\\Time\\SystemClock");
    Ok(())
}

#[test]
fn test_extension_whitelist_controls_discovery() -> anyhow::Result<()> {
    let project = store_project()?;
    let src = project.path().join("src");

    let default_graph = graph_for(&project)?;
    assert!(!default_graph.has_type("App\\View\\Panel"));

    let mut with_templates = TypeGraph::builder()
        .with_name("templates")
        .with_extensions([".php", "PHTML"])
        .build();
    with_templates.add_path(&src)?;
    assert!(with_templates.has_type("App\\View\\Panel"));
    assert_eq!(with_templates.len(), default_graph.len() + 1);
    Ok(())
}

#[test]
fn test_concurrent_requests_share_one_instance() -> anyhow::Result<()> {
    let project = store_project()?;
    let constructed = Arc::new(AtomicUsize::new(0));
    let container = container_for(graph_for(&project)?, constructed.clone());

    let instances: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| container.get_instance("App\\Redis\\RedisStore", Parameters::new()))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker panicked"))
            .collect()
    });

    let first = instances[0].as_ref().map_err(|err| anyhow::anyhow!("{err}"))?;
    for instance in &instances {
        let instance = instance.as_ref().map_err(|err| anyhow::anyhow!("{err}"))?;
        assert!(instance.ptr_eq(first));
    }
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(container.has_instance("App\\Contracts\\Clock"));
    Ok(())
}

#[test]
fn test_hooks_on_interface_apply_to_implementation() -> anyhow::Result<()> {
    let project = store_project()?;
    let mut graph = graph_for(&project)?;
    // 排除另一个实现后 CacheStore 只剩 RedisStore
    std::fs::remove_file(project.path().join("src/Memory/ArrayStore.php"))?;
    graph.reload()?;

    let container = container_for(graph, Arc::new(AtomicUsize::new(0)));
    let rename: PreCreateFilter = Arc::new(|mut params: Parameters| {
        params.set_named("prefix", "hooked:");
        params
    });
    let suffix: PostCreateFilter = Arc::new(|mut object: BoxedComponent| {
        if let Some(store) = object.downcast_mut::<RedisStore>() {
            store.prefix.push_str("v2");
        }
        Ok(object)
    });
    container.on_create("App\\Contracts\\Store", rename);
    container.on_created("App\\Contracts\\CacheStore", suffix);

    let store = container.get::<RedisStore>("App\\Contracts\\CacheStore")?;
    assert_eq!(store.prefix, "hooked:v2");
    assert!(container.has_instance("App\\Contracts\\Store"));
    assert!(container.has_instance("App\\Redis\\RedisStore"));
    Ok(())
}

#[test]
fn test_dependency_annotations_survive_restart() -> anyhow::Result<()> {
    let project = store_project()?;
    {
        let container = container_for(graph_for(&project)?, Arc::new(AtomicUsize::new(0)));
        let store = container.get::<RedisStore>("App\\Redis\\RedisStore")?;
        assert_eq!(store.prefix, "app:");
        assert!(Arc::ptr_eq(
            &store.clock,
            &container.get::<SystemClock>("App\\Contracts\\Clock")?
        ));
    }

    let restored = TypeGraph::builder()
        .with_name("stores")
        .with_cache(Arc::new(FileCache::new(project.path().join("cache"))))
        .build();
    let record = restored
        .record("App\\Redis\\RedisStore")
        .ok_or_else(|| anyhow::anyhow!("record missing after restart"))?;
    assert_eq!(record.extra_info.get("dependencies"), Some(&json!(["App\\Contracts\\Clock"])));
    Ok(())
}

#[test]
fn test_ambiguous_dependency_is_a_graph_error() -> anyhow::Result<()> {
    struct Warmup;
    let project = store_project()?;
    let container = container_for(graph_for(&project)?, Arc::new(AtomicUsize::new(0)));
    container.register_factory(
        ComponentFactory::builder::<Warmup>("App\\Warmup")
            .param(ParamDescriptor::object("store", "App\\Contracts\\Store"))
            .constructor(|_| Ok(Warmup))
            .build(),
    );

    let err = container
        .get_instance("App\\Warmup", Parameters::new())
        .err()
        .ok_or_else(|| anyhow::anyhow!("ambiguous store should not resolve"))?;
    assert!(err.is_graph_error());
    assert!(matches!(
        err,
        DependencyError::Graph(GraphError::AmbiguousResolution { ref candidates, .. }) if candidates.len() == 2
    ));
    Ok(())
}

#[test]
fn test_latin1_source_does_not_abort_directory_scan() -> anyhow::Result<()> {
    let project = tempfile::tempdir()?;
    let src = project.path().join("src");
    write(&src, "A.php", "<?php\nnamespace Legacy;\n\ninterface A {}\n")?;
    write(&src, "B.php", b"<?php\nnamespace Legacy;\n// r\xe9sum\xe9\nabstract class B implements A {}\n")?;
    write(&src, "C.php", "<?php\nnamespace Legacy;\n\nclass C extends B {}\n")?;

    let mut graph = TypeGraph::builder().with_name("legacy").build();
    assert_eq!(graph.add_path(&src)?, 3);
    assert_eq!(graph.scan_units().len(), 1);
    assert_eq!(graph.find_concrete_type("Legacy\\A")?, "Legacy\\C");
    Ok(())
}

#[test]
fn test_reload_keeps_all_units_when_a_file_turns_binary() -> anyhow::Result<()> {
    let project = tempfile::tempdir()?;
    let (a, b) = (project.path().join("a"), project.path().join("b"));
    write(&a, "Y.php", "<?php class Y {}")?;
    write(&b, "W.php", "<?php class W extends Y {}")?;

    let mut graph = TypeGraph::builder()
        .with_name("binary")
        .with_cache(Arc::new(FileCache::new(project.path().join("cache"))))
        .build();
    graph.add_path(&a)?;
    graph.add_path(&b)?;
    write(&a, "Z.php", b"<?php class Z {} \xff\xfe")?;

    match graph.reload() {
        Ok(_) | Err(GraphError::ScanFailures { .. }) => {}
        Err(err) => anyhow::bail!("reload aborted: {err}"),
    }
    assert_eq!(graph.scan_units().len(), 2);
    assert!(graph.has_type("W"));
    assert!(graph.has_type("Z"));
    assert!(graph.is_descendant_of("W", "Y"));
    Ok(())
}

#[test]
fn test_relative_parent_directory_is_scanned_where_it_points() -> anyhow::Result<()> {
    let project = tempfile::tempdir()?;
    write(project.path(), "shared/src/Shared.php", "<?php class Shared {}")?;
    let app = project.path().join("app");
    write(&app, "shared/src/Decoy.php", "<?php class Decoy {}")?;

    // 相对路径相对于 app 目录解析到兄弟目录 shared/src
    let relative = app.join("../shared/src");
    let mut graph = TypeGraph::builder().with_name("relative").build();
    assert_eq!(graph.add_path(&relative)?, 1);
    assert!(graph.has_type("Shared"));
    assert!(!graph.has_type("Decoy"));
    Ok(())
}
