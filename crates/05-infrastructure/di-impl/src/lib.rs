//! # 自动装配核心实现
//!
//! - [`PhpDeclarationScanner`] - 从源文本中提取类型声明
//! - [`TypeGraph`] - 增量维护的类型继承图，持久化到缓存端口
//! - [`Container`] - 基于类型图与组件工厂的自动装配容器
//! - [`LocalFileSystem`] / [`MemoryFileSystem`] - 源文件系统端口实现
//! - [`MemoryCache`] / [`FileCache`] - 缓存端口实现

pub mod cache;
pub mod container;
pub mod fs;
pub mod scanner;
pub mod type_graph;

pub use cache::{FileCache, MemoryCache};
pub use container::{Container, SharedRegistry};
pub use fs::{hash_content, LocalFileSystem, MemoryFileSystem};
pub use scanner::PhpDeclarationScanner;
pub use type_graph::{TypeGraph, TypeGraphBuilder, TypeGraphOptions, CACHE_KEY_PREFIX};
