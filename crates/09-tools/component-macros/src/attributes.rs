//! `#[injectable(...)]` 与 `#[inject(...)]` 属性解析

use syn::{spanned::Spanned, Attribute, Error, Field, Lit, LitStr, Result, Type};

/// 结构体级参数
#[derive(Debug, Default)]
pub struct InjectableArgs {
    /// 注册到容器的限定名，缺省为结构体名
    pub name: Option<String>,
    /// 额外暴露的视图类型，例如 `dyn Logger`
    pub expose: Vec<Type>,
}

impl InjectableArgs {
    pub fn from_attributes(attrs: &[Attribute]) -> Result<Self> {
        let mut args = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("injectable")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    args.name = Some(value.value());
                } else if meta.path.is_ident("expose") {
                    let value: LitStr = meta.value()?.parse()?;
                    args.expose.push(value.parse()?);
                } else {
                    return Err(meta.error("未知的 injectable 参数，可用: name, expose"));
                }
                Ok(())
            })?;
        }
        Ok(args)
    }
}

/// 字段注入方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMode {
    /// 构造参数
    Constructor,
    /// 由 `set_<field>` setter 注入
    Setter,
    /// 使用 `Default::default()`
    Skip,
}

/// 字段级参数
#[derive(Debug)]
pub struct FieldArgs {
    pub mode: FieldMode,
    /// 对象类型参数的声明类型
    pub ty: Option<String>,
    pub default: Option<Lit>,
    pub optional: bool,
    pub collection: bool,
}

impl Default for FieldArgs {
    fn default() -> Self {
        Self {
            mode: FieldMode::Constructor,
            ty: None,
            default: None,
            optional: false,
            collection: false,
        }
    }
}

impl FieldArgs {
    pub fn from_field(field: &Field) -> Result<Self> {
        let mut args = Self::default();
        let mut skip = false;
        let mut setter = false;

        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("ty") {
                    let value: LitStr = meta.value()?.parse()?;
                    args.ty = Some(value.value());
                } else if meta.path.is_ident("default") {
                    args.default = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("optional") {
                    args.optional = true;
                } else if meta.path.is_ident("collection") {
                    args.collection = true;
                } else if meta.path.is_ident("setter") {
                    setter = true;
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else {
                    return Err(meta.error(
                        "未知的 inject 参数，可用: ty, default, optional, collection, setter, skip",
                    ));
                }
                Ok(())
            })?;
        }

        args.mode = match (skip, setter) {
            (true, true) => return Err(Error::new(field.span(), "skip 与 setter 不能同时使用")),
            (true, false) => FieldMode::Skip,
            (false, true) => FieldMode::Setter,
            (false, false) => FieldMode::Constructor,
        };
        args.check(field)?;
        Ok(args)
    }

    fn check(&self, field: &Field) -> Result<()> {
        let conflict = |message: &str| Err(Error::new(field.span(), message));
        match self.mode {
            FieldMode::Skip
                if self.ty.is_some() || self.default.is_some() || self.optional || self.collection =>
            {
                conflict("skip 字段不接受其它 inject 参数")
            }
            FieldMode::Setter if self.ty.is_none() => conflict("setter 字段需要 ty = \"...\""),
            FieldMode::Setter if self.collection || self.default.is_some() => {
                conflict("setter 字段只接受 ty")
            }
            _ if self.collection && (self.ty.is_some() || self.optional) => {
                conflict("collection 参数不能声明 ty 或 optional")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::{parse_quote, DeriveInput};

    fn first_field(input: &DeriveInput) -> &Field {
        match &input.data {
            syn::Data::Struct(data) => data.fields.iter().next().unwrap(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_struct_arguments() {
        let input: DeriveInput = parse_quote! {
            #[injectable(name = "App\\Mailer", expose = "dyn Mailer")]
            struct SmtpMailer;
        };
        let args = InjectableArgs::from_attributes(&input.attrs).unwrap();
        assert_eq!(args.name.as_deref(), Some("App\\Mailer"));
        assert_eq!(args.expose.len(), 1);
    }

    #[test]
    fn parses_object_field() {
        let input: DeriveInput = parse_quote! {
            struct Service {
                #[inject(ty = "App\\Logger", optional)]
                logger: Option<Arc<dyn Logger>>,
            }
        };
        let args = FieldArgs::from_field(first_field(&input)).unwrap();
        assert_eq!(args.mode, FieldMode::Constructor);
        assert_eq!(args.ty.as_deref(), Some("App\\Logger"));
        assert!(args.optional);
    }

    #[test]
    fn rejects_conflicting_options() {
        let setter_without_type: DeriveInput = parse_quote! {
            struct Service {
                #[inject(setter)]
                clock: Option<Arc<Clock>>,
            }
        };
        assert!(FieldArgs::from_field(first_field(&setter_without_type)).is_err());

        let skip_with_default: DeriveInput = parse_quote! {
            struct Service {
                #[inject(skip, default = 1)]
                hits: u64,
            }
        };
        assert!(FieldArgs::from_field(first_field(&skip_with_default)).is_err());

        let unknown: DeriveInput = parse_quote! {
            struct Service {
                #[inject(lazy)]
                hits: u64,
            }
        };
        assert!(FieldArgs::from_field(first_field(&unknown)).is_err());
    }
}
