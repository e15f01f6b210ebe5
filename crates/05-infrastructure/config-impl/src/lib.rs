//! # Configuration Implementation
//!
//! 自动装配设置的加载与验证。
//!
//! ## 主要组件
//!
//! - [`AutowireSettings`] - 扫描、缓存、容器与配置存储设置
//! - [`SettingsLoader`] - 基于 `config` 叠加 TOML/JSON 文件与环境变量
//! - [`SettingsValidator`] - 收集设置中的全部问题

pub mod loader;
pub mod settings;
pub mod validation;

pub use loader::*;
pub use settings::*;
pub use validation::*;
