//! 组件工厂与构造描述符
//!
//! Rust 没有运行时反射，构造器和方法的参数列表由 [`ComponentFactory`] 显式记录：
//! 每个参数的名称、声明类型、默认值。容器据此按类型、按名称或按默认值填充参数。

use infrastructure_common::{
    Argument, Arguments, BoxedComponent, DependencyError, DependencyResult, Instance,
    NamingConventions, ViewTable,
};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 构造器方法名（用于错误信息）
pub const CONSTRUCTOR_METHOD: &str = "new";

/// 参数声明类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// 基础类型（字符串、数字、布尔等）
    Value { type_name: String },
    /// 对象或接口类型
    Object { type_name: String },
    /// 集合类型，吸收剩余的全部位置参数
    Collection,
}

/// 参数描述符
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    /// 参数名
    pub name: String,
    /// 声明类型
    pub kind: ParamKind,
    /// 默认值
    pub default: Option<Argument>,
}

impl ParamDescriptor {
    /// 基础类型参数
    pub fn value(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Value {
                type_name: type_name.into(),
            },
            default: None,
        }
    }

    /// 对象类型参数
    pub fn object(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Object {
                type_name: type_name.into(),
            },
            default: None,
        }
    }

    /// 集合类型参数
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Collection,
            default: None,
        }
    }

    /// 设置默认值
    pub fn with_default(mut self, value: impl Into<Argument>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// 可选参数：默认值为空
    pub fn optional(self) -> Self {
        self.with_default(Argument::null())
    }

    /// 对象参数的声明类型名
    pub fn object_type(&self) -> Option<&str> {
        match &self.kind {
            ParamKind::Object { type_name } => Some(type_name),
            _ => None,
        }
    }
}

/// 构造器描述符
#[derive(Debug, Clone, Default)]
pub struct ConstructorDescriptor {
    /// 按声明顺序排列的参数
    pub params: Vec<ParamDescriptor>,
}

impl ConstructorDescriptor {
    /// 对象类型参数的声明类型列表
    pub fn object_dependencies(&self) -> Vec<String> {
        self.params
            .iter()
            .filter_map(|param| param.object_type().map(ToString::to_string))
            .collect()
    }
}

/// 构造函数类型
pub type ConstructFn = Arc<dyn Fn(&Arguments) -> DependencyResult<BoxedComponent> + Send + Sync>;

/// 可变接收者方法（setter 等，只能在实例冻结前调用）
pub type MutableMethodFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), &Arguments) -> DependencyResult<Argument> + Send + Sync>;

/// 共享接收者方法
pub type SharedMethodFn =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &Arguments) -> DependencyResult<Argument> + Send + Sync>;

/// 方法接收者
#[derive(Clone)]
pub enum MethodReceiver {
    Mutable(MutableMethodFn),
    Shared(SharedMethodFn),
}

/// 方法描述符
#[derive(Clone)]
pub struct MethodDescriptor {
    /// 方法名
    pub name: String,
    /// 参数
    pub params: Vec<ParamDescriptor>,
    /// 调用入口
    pub receiver: MethodReceiver,
}

impl MethodDescriptor {
    /// 是否符合 setter 约定：名称前缀匹配、唯一参数为对象类型
    pub fn is_setter(&self, prefix: &str) -> bool {
        NamingConventions::is_setter_name(&self.name, prefix)
            && self.params.len() == 1
            && self.params[0].object_type().is_some()
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let receiver = match self.receiver {
            MethodReceiver::Mutable(_) => "&mut self",
            MethodReceiver::Shared(_) => "&self",
        };
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("receiver", &receiver)
            .finish()
    }
}

/// 组件工厂
///
/// 以限定名登记，持有构造描述符、构造函数、方法表以及实例视图表。
#[derive(Clone)]
pub struct ComponentFactory {
    type_name: String,
    constructor: ConstructorDescriptor,
    construct: Option<ConstructFn>,
    methods: Vec<MethodDescriptor>,
    views: Arc<ViewTable>,
}

impl ComponentFactory {
    /// 为具体类型 `C` 创建工厂构建器
    pub fn builder<C>(type_name: impl Into<String>) -> ComponentFactoryBuilder<C>
    where
        C: Send + Sync + 'static,
    {
        ComponentFactoryBuilder::new(type_name)
    }

    /// 登记的限定名
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// 构造器描述符
    pub fn constructor(&self) -> &ConstructorDescriptor {
        &self.constructor
    }

    /// 是否有可调用的构造器
    pub fn has_constructor(&self) -> bool {
        self.construct.is_some()
    }

    /// 全部方法
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// 按名称查找方法（不区分大小写）
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|method| method.name.eq_ignore_ascii_case(name))
    }

    /// 符合 setter 约定的方法
    pub fn setters<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a MethodDescriptor> + 'a {
        self.methods.iter().filter(move |method| method.is_setter(prefix))
    }

    /// 调用构造函数
    pub fn construct(&self, arguments: &Arguments) -> DependencyResult<BoxedComponent> {
        match &self.construct {
            Some(construct) => construct(arguments),
            None => Err(DependencyError::NoConstructor {
                type_name: self.type_name.clone(),
            }),
        }
    }

    /// 冻结对象为共享实例
    pub fn freeze(&self, object: BoxedComponent) -> Instance {
        Instance::from_parts(self.type_name.clone(), Arc::from(object), Arc::clone(&self.views))
    }
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("type_name", &self.type_name)
            .field("constructor", &self.constructor)
            .field("has_constructor", &self.construct.is_some())
            .field("methods", &self.methods)
            .field("views", &self.views)
            .finish()
    }
}

/// 组件工厂构建器
pub struct ComponentFactoryBuilder<C> {
    type_name: String,
    params: Vec<ParamDescriptor>,
    construct: Option<ConstructFn>,
    methods: Vec<MethodDescriptor>,
    views: ViewTable,
    _component: PhantomData<fn() -> C>,
}

impl<C> ComponentFactoryBuilder<C>
where
    C: Send + Sync + 'static,
{
    fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: NamingConventions::canonical_name(&type_name.into()),
            params: Vec::new(),
            construct: None,
            methods: Vec::new(),
            views: ViewTable::for_type::<C>(),
            _component: PhantomData,
        }
    }

    /// 追加构造参数
    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// 设置构造函数
    pub fn constructor<F>(mut self, construct: F) -> Self
    where
        F: Fn(&Arguments) -> DependencyResult<C> + Send + Sync + 'static,
    {
        self.construct = Some(Arc::new(move |arguments: &Arguments| {
            construct(arguments).map(|component| Box::new(component) as BoxedComponent)
        }));
        self
    }

    /// 注册 setter：唯一的对象类型参数
    pub fn setter<F>(self, name: impl Into<String>, param: ParamDescriptor, apply: F) -> Self
    where
        F: Fn(&mut C, &Arguments) -> DependencyResult<()> + Send + Sync + 'static,
    {
        self.method_mut(name, vec![param], move |component, arguments| {
            apply(component, arguments).map(|()| Argument::null())
        })
    }

    /// 注册可变接收者方法
    pub fn method_mut<F>(mut self, name: impl Into<String>, params: Vec<ParamDescriptor>, call: F) -> Self
    where
        F: Fn(&mut C, &Arguments) -> DependencyResult<Argument> + Send + Sync + 'static,
    {
        let type_name = self.type_name.clone();
        self.methods.push(MethodDescriptor {
            name: name.into(),
            params,
            receiver: MethodReceiver::Mutable(Arc::new(
                move |object: &mut (dyn Any + Send + Sync), arguments: &Arguments| {
                    let component = object
                        .downcast_mut::<C>()
                        .ok_or_else(|| receiver_mismatch::<C>(&type_name))?;
                    call(component, arguments)
                },
            )),
        });
        self
    }

    /// 注册共享接收者方法
    pub fn method<F>(mut self, name: impl Into<String>, params: Vec<ParamDescriptor>, call: F) -> Self
    where
        F: Fn(&C, &Arguments) -> DependencyResult<Argument> + Send + Sync + 'static,
    {
        let type_name = self.type_name.clone();
        self.methods.push(MethodDescriptor {
            name: name.into(),
            params,
            receiver: MethodReceiver::Shared(Arc::new(
                move |object: &(dyn Any + Send + Sync), arguments: &Arguments| {
                    let component = object
                        .downcast_ref::<C>()
                        .ok_or_else(|| receiver_mismatch::<C>(&type_name))?;
                    call(component, arguments)
                },
            )),
        });
        self
    }

    /// 声明实例可以作为 `Arc<T>` 提供，通常用于 trait object
    pub fn expose<T>(mut self, upcast: impl Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.views.expose::<C, T>(upcast);
        self
    }

    /// 构建工厂
    pub fn build(self) -> ComponentFactory {
        ComponentFactory {
            type_name: self.type_name,
            constructor: ConstructorDescriptor {
                params: self.params,
            },
            construct: self.construct,
            methods: self.methods,
            views: Arc::new(self.views),
        }
    }
}

fn receiver_mismatch<C>(type_name: &str) -> DependencyError {
    DependencyError::creation_failed(
        type_name,
        format!("接收者类型不是 {}", std::any::type_name::<C>()),
    )
}

/// 可注入组件
///
/// 通常由 `#[derive(Injectable)]` 生成。
pub trait Injectable: Send + Sync + Sized + 'static {
    /// 创建该类型的组件工厂
    fn factory() -> ComponentFactory;
}
