//! 依赖注入容器实现
//!
//! 容器向类型图询问“哪个具体类型满足这个名称”，再按组件工厂的构造描述符逐个填充参数：
//! 调用方给出的位置参数、调用方给出的命名参数、配置存储（基础类型）、递归获取实例（对象类型）、
//! 默认值。构造完成后执行 setter 注入与后置过滤，最后冻结为共享实例。

use di_abstractions::{
    ComponentFactory, ContainerConfig, ContainerStats, DiContainer, FactoryRegistry, FilterHook,
    Injectable, MethodReceiver, ParamDescriptor, ParamKind, PostCreateFilter, PreCreateFilter,
    ResolveContext, ResolveOptions, TypeRegistry, CONSTRUCTOR_METHOD,
};
use infrastructure_common::{
    Argument, Arguments, BoxedComponent, ConfigSection, DependencyError, DependencyResult,
    Instance, NamingConventions, Parameters,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// 共享的类型注册表
pub type SharedRegistry = Arc<RwLock<dyn TypeRegistry>>;

/// 依赖注入容器
pub struct Container {
    graph: SharedRegistry,
    factories: RwLock<FactoryRegistry>,
    instances: RwLock<HashMap<String, Instance>>,
    /// 按注册顺序保存的 (类型键, 钩子)
    hooks: RwLock<Vec<(String, FilterHook)>>,
    parameters: ConfigSection,
    config: ContainerConfig,
    /// 保护 get_instance 的“检查后创建”序列
    creation_lock: ReentrantMutex<()>,
    annotated: Mutex<HashSet<String>>,
    stats: Mutex<ContainerStats>,
}

impl Container {
    /// 基于类型注册表创建容器
    pub fn new(graph: SharedRegistry) -> Self {
        Self {
            graph,
            factories: RwLock::new(FactoryRegistry::new()),
            instances: RwLock::new(HashMap::new()),
            hooks: RwLock::new(Vec::new()),
            parameters: ConfigSection::new(),
            config: ContainerConfig::default(),
            creation_lock: ReentrantMutex::new(()),
            annotated: Mutex::new(HashSet::new()),
            stats: Mutex::new(ContainerStats::default()),
        }
    }

    /// 设置容器配置
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置配置存储，基础类型参数从中按参数名取值
    pub fn with_parameters(mut self, parameters: ConfigSection) -> Self {
        self.parameters = parameters;
        self
    }

    /// 使用已有的工厂注册表
    pub fn with_factories(self, factories: FactoryRegistry) -> Self {
        *self.factories.write() = factories;
        self
    }

    /// 容器使用的类型注册表
    pub fn registry(&self) -> &SharedRegistry {
        &self.graph
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 注册组件工厂
    pub fn register_factory(&self, factory: ComponentFactory) {
        debug!("注册组件工厂: {}", factory.type_name());
        self.factories.write().register(factory);
    }

    /// 注册可注入类型
    pub fn register<T: Injectable>(&self) {
        self.register_factory(T::factory());
    }

    /// 获取实例并转换为 `Arc<T>`，`T` 可以是具体类型或已暴露的 trait object
    pub fn get<T>(&self, name: &str) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.get_instance(name, Parameters::new())?;
        instance
            .cast::<T>()
            .ok_or_else(|| DependencyError::ArgumentMismatch {
                parameter: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
                found: instance.type_name().to_string(),
            })
    }

    /// 统计信息快照
    pub fn stats(&self) -> ContainerStats {
        let mut stats = self.stats.lock().clone();
        stats.registered_factories = self.factories.read().len();
        stats.active_instances = self.instances.read().len();
        stats
    }

    fn new_context(&self) -> ResolveContext {
        ResolveContext::with_options(ResolveOptions {
            max_depth: self.config.max_resolution_depth,
        })
    }

    fn record_error<T>(&self, result: DependencyResult<T>) -> DependencyResult<T> {
        if result.is_err() {
            self.stats.lock().resolution_errors += 1;
        }
        result
    }

    fn memoized(&self, key: &str) -> Option<Instance> {
        let instance = self.instances.read().get(key).cloned();
        if instance.is_some() {
            self.stats.lock().memo_hits += 1;
        }
        instance
    }

    fn get_instance_in(
        &self,
        name: &str,
        params: Parameters,
        context: &mut ResolveContext,
    ) -> DependencyResult<Instance> {
        let key = NamingConventions::normalize_key(name);
        if let Some(instance) = self.memoized(&key) {
            debug!("实例命中记忆: {}", name);
            return Ok(instance);
        }

        let _guard = self.creation_lock.lock();
        if let Some(instance) = self.memoized(&key) {
            return Ok(instance);
        }
        let instance = self.create_in(name, params, context)?;
        self.store(name, &instance);
        Ok(instance)
    }

    /// 名称 -> (具体类型, 工厂)
    ///
    /// 类型图不认识、但显式注册了工厂的名称直接使用工厂，不触发类型图重载。
    fn resolve_factory(&self, name: &str) -> DependencyResult<(String, Arc<ComponentFactory>)> {
        let known = self.graph.read().has_type(name);
        let registered = self.factories.read().get(name);

        let concrete = match (known, registered) {
            (false, Some(factory)) => return Ok((factory.type_name().to_string(), factory)),
            _ => self.graph.write().find_concrete_type(name)?,
        };

        let record = self.graph.read().record(&concrete);
        if record.is_some_and(|record| !record.instantiable) {
            return Err(DependencyError::NotInstantiable {
                type_name: concrete,
            });
        }
        let factory = self
            .factories
            .read()
            .get(&concrete)
            .ok_or_else(|| DependencyError::NoConstructor {
                type_name: concrete.clone(),
            })?;
        Ok((concrete, factory))
    }

    fn create_in(
        &self,
        name: &str,
        params: Parameters,
        context: &mut ResolveContext,
    ) -> DependencyResult<Instance> {
        let (concrete, factory) = self.resolve_factory(name)?;
        context.push_type(&concrete)?;
        let result = self.construct(&concrete, &factory, params, context);
        context.pop_type();
        result
    }

    fn hooks_for(&self, concrete: &str) -> Vec<FilterHook> {
        let hooks = self.hooks.read().clone();
        if hooks.is_empty() {
            return Vec::new();
        }
        let graph = self.graph.read();
        hooks
            .into_iter()
            .filter(|(key, _)| graph.is_descendant_of(concrete, key))
            .map(|(_, hook)| hook)
            .collect()
    }

    fn construct(
        &self,
        concrete: &str,
        factory: &ComponentFactory,
        params: Parameters,
        context: &mut ResolveContext,
    ) -> DependencyResult<Instance> {
        let hooks = self.hooks_for(concrete);

        let params = hooks.iter().fold(params, |params, hook| match hook {
            FilterHook::PreCreate(filter) => filter(params),
            FilterHook::PostCreate(_) => params,
        });

        let arguments = self.resolve_arguments(
            concrete,
            CONSTRUCTOR_METHOD,
            &factory.constructor().params,
            &params,
            context,
        )?;
        let mut object = factory.construct(&arguments)?;

        if self.config.enable_setter_injection {
            self.inject_setters(concrete, factory, &mut object, context);
        }

        for hook in &hooks {
            if let FilterHook::PostCreate(filter) = hook {
                object = filter(object)?;
            }
        }

        let instance = factory.freeze(object);
        self.annotate_dependencies(concrete, factory);
        self.stats.lock().created_instances += 1;
        debug!("创建实例: {}", concrete);
        Ok(instance)
    }

    /// 尽力而为的 setter 注入，失败时跳过
    fn inject_setters(
        &self,
        concrete: &str,
        factory: &ComponentFactory,
        object: &mut BoxedComponent,
        context: &mut ResolveContext,
    ) {
        for setter in factory.setters(&self.config.setter_prefix) {
            let Some((param, type_name)) = setter
                .params
                .first()
                .and_then(|param| param.object_type().map(|type_name| (param, type_name)))
            else {
                continue;
            };

            let applied = self
                .get_instance_in(type_name, Parameters::new(), context)
                .and_then(|dependency| {
                    let arguments = Arguments::new(
                        concrete,
                        setter.name.clone(),
                        vec![(param.name.clone(), Argument::Instance(dependency))],
                    );
                    match &setter.receiver {
                        MethodReceiver::Mutable(call) => call(&mut **object, &arguments),
                        MethodReceiver::Shared(call) => call(&**object, &arguments),
                    }
                });

            if let Err(err) = applied {
                debug!("跳过 setter 注入 {}::{}: {}", concrete, setter.name, err);
                self.stats.lock().skipped_setters += 1;
            }
        }
    }

    fn annotate_dependencies(&self, concrete: &str, factory: &ComponentFactory) {
        if !self.config.annotate_dependencies {
            return;
        }
        let key = NamingConventions::normalize_key(concrete);
        if !self.annotated.lock().insert(key) {
            return;
        }
        if !self.graph.read().has_type(concrete) {
            return;
        }

        let dependencies = factory.constructor().object_dependencies();
        let info = HashMap::from([(
            "dependencies".to_string(),
            serde_json::json!(dependencies),
        )]);
        if let Err(err) = self.graph.write().annotate(concrete, info) {
            debug!("写入依赖信息失败 {}: {}", concrete, err);
        }
    }

    /// 按声明顺序为每个参数取值
    fn resolve_arguments(
        &self,
        declaring_type: &str,
        method: &str,
        descriptors: &[ParamDescriptor],
        params: &Parameters,
        context: &mut ResolveContext,
    ) -> DependencyResult<Arguments> {
        let mut entries = Vec::with_capacity(descriptors.len());
        for (index, param) in descriptors.iter().enumerate() {
            let value = self.resolve_argument(declaring_type, method, index, param, params, context)?;
            entries.push((param.name.clone(), value));
        }
        Ok(Arguments::new(declaring_type, method, entries))
    }

    fn resolve_argument(
        &self,
        declaring_type: &str,
        method: &str,
        index: usize,
        param: &ParamDescriptor,
        params: &Parameters,
        context: &mut ResolveContext,
    ) -> DependencyResult<Argument> {
        // 集合参数吸收剩余的全部位置参数
        if param.kind == ParamKind::Collection {
            let rest = params.remaining_from(index);
            if !rest.is_empty() {
                return Ok(Argument::List(rest));
            }
            return Ok(params
                .get_named(&param.name)
                .or(param.default.as_ref())
                .cloned()
                .unwrap_or_else(|| Argument::List(Vec::new())));
        }

        if let Some(value) = params.get_positional(index) {
            return Ok(value.clone());
        }
        if let Some(value) = params.get_named(&param.name) {
            return Ok(value.clone());
        }

        match &param.kind {
            ParamKind::Object { type_name } => {
                match self.get_instance_in(type_name, Parameters::new(), context) {
                    Ok(instance) => Ok(Argument::Instance(instance)),
                    Err(err) => match &param.default {
                        Some(default) => {
                            debug!(
                                "{}::{} 的参数 `{}` 使用默认值: {}",
                                declaring_type, method, param.name, err
                            );
                            Ok(default.clone())
                        }
                        None if err.is_graph_error() => Err(err),
                        None => Err(DependencyError::UnsatisfiedDependency {
                            declaring_type: declaring_type.to_string(),
                            method: method.to_string(),
                            parameter: param.name.clone(),
                            source: Some(Box::new(err)),
                        }),
                    },
                }
            }
            _ => self
                .parameters
                .get(&param.name)
                .cloned()
                .map(Argument::Value)
                .or_else(|| param.default.clone())
                .ok_or_else(|| DependencyError::unsatisfied(declaring_type, method, &param.name)),
        }
    }

    /// 登记实例：名称、具体类型以及类型图报告的全部祖先
    fn store(&self, name: &str, instance: &Instance) {
        let mut keys: Vec<String> = vec![
            NamingConventions::normalize_key(name),
            NamingConventions::normalize_key(instance.type_name()),
        ];
        keys.extend(
            self.graph
                .read()
                .ancestors(instance.type_name())
                .iter()
                .map(|ancestor| NamingConventions::normalize_key(ancestor)),
        );

        let mut instances = self.instances.write();
        for key in keys {
            instances.insert(key, instance.clone());
        }
    }

    fn add_hook(&self, name: &str, hook: FilterHook) {
        debug!("注册 {} 钩子: {}", hook.stage(), name);
        self.hooks
            .write()
            .push((NamingConventions::normalize_key(name), hook));
    }
}

impl DiContainer for Container {
    fn has_instance(&self, name: &str) -> bool {
        self.instances
            .read()
            .contains_key(&NamingConventions::normalize_key(name))
    }

    fn set_instance(&self, name: &str, instance: Instance) -> DependencyResult<()> {
        info!("登记实例: {} ({})", name, instance.type_name());
        self.store(name, &instance);
        Ok(())
    }

    fn get_instance(&self, name: &str, params: Parameters) -> DependencyResult<Instance> {
        let mut context = self.new_context();
        let result = self.get_instance_in(name, params, &mut context);
        self.record_error(result)
    }

    fn create_instance(&self, name: &str, params: Parameters) -> DependencyResult<Instance> {
        let mut context = self.new_context();
        let result = self.create_in(name, params, &mut context);
        self.record_error(result)
    }

    fn call_method(
        &self,
        instance: &Instance,
        method: &str,
        params: Parameters,
    ) -> DependencyResult<Argument> {
        let not_found = || DependencyError::MethodNotFound {
            type_name: instance.type_name().to_string(),
            method: method.to_string(),
        };
        let factory = self
            .factories
            .read()
            .get(instance.type_name())
            .ok_or_else(not_found)?;
        let descriptor = factory.method(method).ok_or_else(not_found)?;

        let mut context = self.new_context();
        let arguments = self.resolve_arguments(
            instance.type_name(),
            &descriptor.name,
            &descriptor.params,
            &params,
            &mut context,
        )?;
        match &descriptor.receiver {
            MethodReceiver::Shared(call) => call(&**instance.object(), &arguments),
            MethodReceiver::Mutable(_) => Err(DependencyError::ArgumentMismatch {
                parameter: "self".to_string(),
                expected: "&mut self（仅在实例冻结前可用）".to_string(),
                found: "共享实例".to_string(),
            }),
        }
    }

    fn on_create(&self, name: &str, filter: PreCreateFilter) {
        self.add_hook(name, FilterHook::PreCreate(filter));
    }

    fn on_created(&self, name: &str, filter: PostCreateFilter) {
        self.add_hook(name, FilterHook::PostCreate(filter));
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("factories", &self.factories.read().names())
            .field("instances", &self.instances.read().len())
            .field("hooks", &self.hooks.read().len())
            .field("config", &self.config)
            .finish()
    }
}
