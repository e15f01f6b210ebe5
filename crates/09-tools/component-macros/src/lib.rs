//! # Component Macros
//!
//! 为结构体生成 `di_abstractions::Injectable` 实现，使其可以注册到自动装配容器。
//!
//! 生成的代码引用 `::di_abstractions` 与 `::infrastructure_common`，
//! 使用方需要同时依赖这两个 crate。
//!
//! ## 使用示例
//!
//! ```ignore
//! use component_macros::Injectable;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! #[injectable(name = "App\\SmtpMailer", expose = "dyn Mailer")]
//! pub struct SmtpMailer {
//!     #[inject(ty = "App\\Logger")]
//!     logger: Arc<dyn Logger>,
//!     host: String,
//!     #[inject(default = 25)]
//!     port: i64,
//!     #[inject(setter, ty = "App\\Clock")]
//!     clock: Option<Arc<dyn Clock>>,
//!     #[inject(skip)]
//!     sent: u64,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attributes;
mod injectable;
mod utils;

/// 可注入组件派生宏
///
/// 具名字段按声明顺序成为构造参数，参数名即字段名。
///
/// # 结构体参数 `#[injectable(...)]`
///
/// - `name = "App\\Service"` - 注册到容器的限定名（默认为结构体名）
/// - `expose = "dyn Trait"` - 额外暴露的视图类型，可重复
///
/// # 字段参数 `#[inject(...)]`
///
/// - `ty = "App\\Logger"` - 对象参数，按限定名从容器解析
/// - `default = <字面量>` - 未提供参数时使用的默认值
/// - `optional` - 解析失败时注入空值（`Option` 字段默认即为可选）
/// - `collection` - 收集剩余的位置参数
/// - `setter` - 构造后由 `set_<字段名>` 注入，需要同时给出 `ty`
/// - `skip` - 不注入，使用 `Default::default()`
#[proc_macro_derive(Injectable, attributes(injectable, inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
