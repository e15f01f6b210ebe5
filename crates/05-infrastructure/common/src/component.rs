//! 组件运行时表示
//!
//! 容器构造出的对象以类型擦除的形式保存。`Instance` 除了对象本身，
//! 还带有一张视图表，记录该对象可以被转换成哪些 `Arc<T>`（具体类型或 trait object），
//! 这样声明为接口类型的参数也能拿到正确的 `Arc<dyn Trait>`。

use crate::errors::{DependencyError, DependencyResult};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// 共享的类型擦除对象
pub type SharedObject = Arc<dyn Any + Send + Sync>;

/// 尚未冻结的组件对象（setter 注入与后置过滤在此阶段进行）
pub type BoxedComponent = Box<dyn Any + Send + Sync>;

type Caster = Arc<dyn Fn(&SharedObject) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 视图表
#[derive(Clone, Default)]
pub struct ViewTable {
    casters: HashMap<TypeId, Caster>,
    names: Vec<&'static str>,
}

impl ViewTable {
    /// 创建空视图表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建只包含具体类型自身视图的视图表
    pub fn for_type<C>() -> Self
    where
        C: Send + Sync + 'static,
    {
        let mut table = Self::default();
        table.expose::<C, C>(|component| component);
        table
    }

    /// 注册一个视图：具体类型 `C` 可以被转换为 `Arc<T>`
    pub fn expose<C, T>(&mut self, upcast: impl Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static)
    where
        C: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |object: &SharedObject| {
            object
                .clone()
                .downcast::<C>()
                .ok()
                .map(|component| Box::new(upcast(component)) as Box<dyn Any + Send + Sync>)
        });
        self.casters.insert(TypeId::of::<Arc<T>>(), caster);
        self.names.push(std::any::type_name::<T>());
    }

    /// 是否支持转换为 `Arc<T>`
    pub fn supports<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.casters.contains_key(&TypeId::of::<Arc<T>>())
    }

    fn cast<T>(&self, object: &SharedObject) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let caster = self.casters.get(&TypeId::of::<Arc<T>>())?;
        caster(object)?.downcast::<Arc<T>>().ok().map(|view| *view)
    }
}

impl fmt::Debug for ViewTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewTable")
            .field("views", &self.names)
            .finish()
    }
}

/// 已构造的组件实例
#[derive(Clone)]
pub struct Instance {
    type_name: Arc<str>,
    object: SharedObject,
    views: Arc<ViewTable>,
}

impl Instance {
    /// 包装一个具体对象
    pub fn new<C>(type_name: impl Into<String>, value: C) -> Self
    where
        C: Send + Sync + 'static,
    {
        Self::from_arc(type_name, Arc::new(value))
    }

    /// 包装一个已共享的具体对象
    pub fn from_arc<C>(type_name: impl Into<String>, value: Arc<C>) -> Self
    where
        C: Send + Sync + 'static,
    {
        Self {
            type_name: Arc::from(type_name.into()),
            object: value,
            views: Arc::new(ViewTable::for_type::<C>()),
        }
    }

    /// 由工厂使用：对象与视图表分开给出
    pub fn from_parts(type_name: impl Into<String>, object: SharedObject, views: Arc<ViewTable>) -> Self {
        Self {
            type_name: Arc::from(type_name.into()),
            object,
            views,
        }
    }

    /// 追加一个视图
    pub fn with_view<C, T>(mut self, upcast: impl Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static) -> Self
    where
        C: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.views).expose(upcast);
        self
    }

    /// 实例的具体类型名
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// 类型擦除的对象
    pub fn object(&self) -> &SharedObject {
        &self.object
    }

    /// 转换为具体类型
    pub fn downcast<C>(&self) -> Option<Arc<C>>
    where
        C: Send + Sync + 'static,
    {
        self.object.clone().downcast::<C>().ok()
    }

    /// 通过视图表转换，支持 trait object
    pub fn cast<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.views.cast::<T>(&self.object)
    }

    /// 是否为同一个对象
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .field("views", &self.views)
            .finish_non_exhaustive()
    }
}

/// 构造参数值
#[derive(Debug, Clone)]
pub enum Argument {
    /// 基础类型值
    Value(serde_json::Value),
    /// 对象
    Instance(Instance),
    /// 集合（兜底参数）
    List(Vec<Argument>),
}

impl Argument {
    /// 空值
    pub fn null() -> Self {
        Self::Value(serde_json::Value::Null)
    }

    /// 是否为空值
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(serde_json::Value::Null))
    }

    /// 值类别，用于错误信息
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Value(serde_json::Value::Null) => "null",
            Self::Value(_) => "value",
            Self::Instance(_) => "instance",
            Self::List(_) => "list",
        }
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Argument]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Argument {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

impl From<Instance> for Argument {
    fn from(instance: Instance) -> Self {
        Self::Instance(instance)
    }
}

impl From<Vec<Argument>> for Argument {
    fn from(items: Vec<Argument>) -> Self {
        Self::List(items)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::Value(serde_json::Value::from(value))
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::Value(serde_json::Value::from(value))
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Self::Value(serde_json::Value::from(value))
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Self::Value(serde_json::Value::from(value))
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Self::Value(serde_json::Value::from(value))
    }
}

/// 调用方提供的参数：按位置或按名称
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    positional: BTreeMap<usize, Argument>,
    named: HashMap<String, Argument>,
}

impl Parameters {
    /// 创建空参数集
    pub fn new() -> Self {
        Self::default()
    }

    /// 由位置参数列表创建
    pub fn positional<I, A>(values: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        Self {
            positional: values
                .into_iter()
                .map(Into::into)
                .enumerate()
                .collect(),
            named: HashMap::new(),
        }
    }

    /// 设置指定位置的参数
    pub fn at(mut self, index: usize, value: impl Into<Argument>) -> Self {
        self.positional.insert(index, value.into());
        self
    }

    /// 设置命名参数
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Argument>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// 就地设置命名参数（供过滤器使用）
    pub fn set_named(&mut self, name: impl Into<String>, value: impl Into<Argument>) {
        self.named.insert(name.into(), value.into());
    }

    pub fn get_positional(&self, index: usize) -> Option<&Argument> {
        self.positional.get(&index)
    }

    pub fn get_named(&self, name: &str) -> Option<&Argument> {
        self.named.get(name)
    }

    /// 从指定位置开始的全部剩余位置参数
    pub fn remaining_from(&self, index: usize) -> Vec<Argument> {
        self.positional
            .range(index..)
            .map(|(_, value)| value.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// 可以从构造参数值转换的类型
pub trait FromArgument: Sized {
    /// 期望类型的描述
    fn expected() -> String;

    /// 尝试转换
    fn from_argument(argument: &Argument) -> Option<Self>;
}

impl FromArgument for Argument {
    fn expected() -> String {
        "any".to_string()
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        Some(argument.clone())
    }
}

impl FromArgument for serde_json::Value {
    fn expected() -> String {
        "value".to_string()
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_value().cloned()
    }
}

impl FromArgument for String {
    fn expected() -> String {
        "string".to_string()
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_value()?.as_str().map(ToString::to_string)
    }
}

impl FromArgument for bool {
    fn expected() -> String {
        "bool".to_string()
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_value()?.as_bool()
    }
}

impl FromArgument for f64 {
    fn expected() -> String {
        "f64".to_string()
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_value()?.as_f64()
    }
}

macro_rules! integer_argument {
    ($($ty:ty),*) => {$(
        impl FromArgument for $ty {
            fn expected() -> String {
                stringify!($ty).to_string()
            }

            fn from_argument(argument: &Argument) -> Option<Self> {
                let value = argument.as_value()?;
                value
                    .as_i64()
                    .and_then(|v| <$ty>::try_from(v).ok())
                    .or_else(|| value.as_u64().and_then(|v| <$ty>::try_from(v).ok()))
            }
        }
    )*};
}

integer_argument!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: FromArgument> FromArgument for Option<T> {
    fn expected() -> String {
        format!("Option<{}>", T::expected())
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        if argument.is_null() {
            Some(None)
        } else {
            T::from_argument(argument).map(Some)
        }
    }
}

impl<T: FromArgument> FromArgument for Vec<T> {
    fn expected() -> String {
        format!("Vec<{}>", T::expected())
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::List(items) => items.iter().map(T::from_argument).collect(),
            Argument::Value(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| T::from_argument(&Argument::Value(item.clone())))
                .collect(),
            _ => None,
        }
    }
}

impl FromArgument for Instance {
    fn expected() -> String {
        "instance".to_string()
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_instance().cloned()
    }
}

impl<T> FromArgument for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn expected() -> String {
        format!("Arc<{}>", std::any::type_name::<T>())
    }

    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_instance()?.cast::<T>()
    }
}

/// 已解析完成、按声明顺序排列的参数
#[derive(Debug, Clone)]
pub struct Arguments {
    declaring_type: String,
    method: String,
    entries: Vec<(String, Argument)>,
}

impl Arguments {
    /// 创建参数列表
    pub fn new(
        declaring_type: impl Into<String>,
        method: impl Into<String>,
        entries: Vec<(String, Argument)>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            method: method.into(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 原始参数值
    pub fn raw(&self, index: usize) -> Option<&Argument> {
        self.entries.get(index).map(|(_, value)| value)
    }

    /// 按位置取出并转换参数
    pub fn get<T: FromArgument>(&self, index: usize) -> DependencyResult<T> {
        let (name, value) = self.entries.get(index).ok_or_else(|| {
            DependencyError::unsatisfied(&self.declaring_type, &self.method, format!("#{index}"))
        })?;
        Self::convert(name, value)
    }

    /// 按名称取出并转换参数
    pub fn by_name<T: FromArgument>(&self, name: &str) -> DependencyResult<T> {
        let (name, value) = self
            .entries
            .iter()
            .find(|(candidate, _)| candidate == name)
            .ok_or_else(|| DependencyError::unsatisfied(&self.declaring_type, &self.method, name))?;
        Self::convert(name, value)
    }

    fn convert<T: FromArgument>(name: &str, value: &Argument) -> DependencyResult<T> {
        T::from_argument(value).ok_or_else(|| DependencyError::ArgumentMismatch {
            parameter: name.to_string(),
            expected: T::expected(),
            found: value.kind().to_string(),
        })
    }
}
