//! # Dependency Injection Abstractions
//!
//! 自动装配核心的端口与契约。
//!
//! ## 核心接口
//!
//! - [`DeclarationScanner`] - 源文件声明扫描器
//! - [`TypeRegistry`] - 类型图查询与登记
//! - [`SourceFileSystem`] / [`CacheStore`] - 类型图消费的文件系统与缓存端口
//! - [`DiContainer`] - 依赖注入容器
//! - [`ComponentFactory`] - 构造描述符与构造函数

pub mod cache;
pub mod container;
pub mod discovery;
pub mod factory;
pub mod registry;
pub mod resolver;
pub mod scanner;

pub use cache::*;
pub use container::*;
pub use discovery::*;
pub use factory::*;
pub use registry::*;
pub use resolver::*;
pub use scanner::*;
