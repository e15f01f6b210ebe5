//! # Infrastructure Common
//!
//! 自动装配核心的公共类型：错误分类、命名约定、类型记录、运行时参数与实例表示。
//!
//! ## 核心类型
//!
//! - [`TypeRecord`] / [`DeclarationInfo`] - 扫描产出并由类型图持有的类型元数据
//! - [`NamingConventions`] - 大小写无关、分隔符规范化的查找键
//! - [`Instance`] / [`Argument`] / [`Parameters`] - 容器构造过程中流转的值
//! - [`ConfigSection`] - 容器的配置存储
//!
//! ## 设计原则
//!
//! - 不依赖全局状态，所有协作者显式传递
//! - 类型擦除只发生在容器边界，取值时通过视图表恢复强类型

pub mod component;
pub mod configuration;
pub mod conventions;
pub mod errors;
pub mod metadata;

pub use component::*;
pub use configuration::*;
pub use conventions::*;
pub use errors::*;
pub use metadata::*;
