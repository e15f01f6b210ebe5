//! # 基础设施组合层
//!
//! 把设置、源文件系统、缓存、类型图和容器组装成一个可用的自动装配核心。
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use config_impl::SettingsLoader;
//! use infrastructure_composition::{AutowireBuilder, LoggingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = SettingsLoader::new().with_optional_file("autowire.toml");
//!     let autowire = AutowireBuilder::from_loader(&loader)?
//!         .with_logging(LoggingConfig::development())
//!         .build()?;
//!
//!     let concrete = autowire.find_concrete_type("App\\Mailer")?;
//!     println!("App\\Mailer -> {concrete}");
//!     Ok(())
//! }
//! ```

pub mod autowire;
pub mod builder;
pub mod error;
pub mod logging;

pub use autowire::Autowire;
pub use builder::AutowireBuilder;
pub use error::{BootstrapError, BootstrapResult};
pub use logging::{init_tracing, LoggingConfig};
