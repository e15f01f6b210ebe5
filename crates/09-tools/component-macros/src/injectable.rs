//! `#[derive(Injectable)]` 代码生成

use crate::attributes::{FieldArgs, FieldMode, InjectableArgs};
use crate::utils::{is_option_type, type_label};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Error, Fields, Lit, Result};

/// 生成 `Injectable` 实现
pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let ident = &input.ident;
    let args = InjectableArgs::from_attributes(&input.attrs)?;
    let type_name = args.name.unwrap_or_else(|| ident.to_string());

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(Error::new_spanned(ident, "Injectable 只能用于结构体"))
        }
    };

    let mut params = Vec::new();
    let mut setters = Vec::new();
    let construct = match fields {
        Fields::Unit => quote! { Self },
        Fields::Unnamed(_) => {
            return Err(Error::new_spanned(
                ident,
                "Injectable 需要具名字段，构造参数按字段名注入",
            ))
        }
        Fields::Named(named) => {
            let mut inits = Vec::new();
            for field in &named.named {
                let Some(field_ident) = field.ident.as_ref() else {
                    continue;
                };
                let name = field_ident.to_string();
                let field_args = FieldArgs::from_field(field)?;

                match field_args.mode {
                    FieldMode::Skip => {
                        inits.push(quote! { #field_ident: ::core::default::Default::default() });
                    }
                    FieldMode::Setter => {
                        let setter_name = format!("set_{name}");
                        let declared = field_args.ty.unwrap_or_default();
                        inits.push(quote! { #field_ident: ::core::default::Default::default() });
                        setters.push(quote! {
                            .setter(
                                #setter_name,
                                ::di_abstractions::ParamDescriptor::object(#name, #declared),
                                |component: &mut Self, args: &::infrastructure_common::Arguments| {
                                    component.#field_ident = args.get(0)?;
                                    ::core::result::Result::Ok(())
                                },
                            )
                        });
                    }
                    FieldMode::Constructor => {
                        let index = params.len();
                        params.push(param_descriptor(&name, &field.ty, &field_args));
                        inits.push(quote! { #field_ident: args.get(#index)? });
                    }
                }
            }
            quote! { Self { #(#inits),* } }
        }
    };

    let args_ident = if params.is_empty() {
        format_ident!("_args")
    } else {
        format_ident!("args")
    };
    let exposed = &args.expose;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::di_abstractions::Injectable for #ident #ty_generics #where_clause {
            fn factory() -> ::di_abstractions::ComponentFactory {
                ::di_abstractions::ComponentFactory::builder::<Self>(#type_name)
                    #(.param(#params))*
                    .constructor(|#args_ident: &::infrastructure_common::Arguments| {
                        ::core::result::Result::Ok(#construct)
                    })
                    #(#setters)*
                    #(.expose::<#exposed>(|component| component as ::std::sync::Arc<#exposed>))*
                    .build()
            }
        }
    })
}

fn param_descriptor(name: &str, ty: &syn::Type, args: &FieldArgs) -> TokenStream {
    let mut descriptor = if args.collection {
        quote! { ::di_abstractions::ParamDescriptor::collection(#name) }
    } else if let Some(declared) = &args.ty {
        quote! { ::di_abstractions::ParamDescriptor::object(#name, #declared) }
    } else {
        let label = type_label(ty);
        quote! { ::di_abstractions::ParamDescriptor::value(#name, #label) }
    };

    // Option 字段未声明默认值时视为可选
    if args.optional || (args.default.is_none() && is_option_type(ty)) {
        descriptor = quote! { #descriptor.optional() };
    }
    if let Some(default) = &args.default {
        let value = default_value(default);
        descriptor = quote! { #descriptor.with_default(#value) };
    }
    descriptor
}

/// 整数与浮点字面量需要明确宽度才能转换为参数值
fn default_value(lit: &Lit) -> TokenStream {
    match lit {
        Lit::Int(int) => quote! { (#int as i64) },
        Lit::Float(float) => quote! { (#float as f64) },
        other => quote! { #other },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_to_string(input: DeriveInput) -> String {
        expand(&input).unwrap().to_string()
    }

    #[test]
    fn generates_constructor_params_in_field_order() {
        let output = expand_to_string(parse_quote! {
            #[injectable(name = "App\\SmtpMailer")]
            struct SmtpMailer {
                #[inject(ty = "App\\Logger")]
                logger: Arc<dyn Logger>,
                host: String,
                #[inject(default = 25)]
                port: u16,
            }
        });

        assert!(output.contains("builder :: < Self > (\"App\\\\SmtpMailer\")"));
        let logger = output.find("ParamDescriptor :: object (\"logger\"").unwrap();
        let host = output.find("ParamDescriptor :: value (\"host\" , \"String\")").unwrap();
        let port = output.find("with_default ((25 as i64))").unwrap();
        assert!(logger < host && host < port);
        assert!(output.contains("port : args . get (2usize) ?"));
    }

    #[test]
    fn setter_and_skip_fields_use_defaults() {
        let output = expand_to_string(parse_quote! {
            struct Report {
                #[inject(setter, ty = "App\\Clock")]
                clock: Option<Arc<Clock>>,
                #[inject(skip)]
                hits: u64,
            }
        });

        assert!(output.contains("builder :: < Self > (\"Report\")"));
        assert!(output.contains(". setter (\"set_clock\""));
        assert!(output.contains("hits : :: core :: default :: Default :: default ()"));
        assert!(output.contains("| _args : & :: infrastructure_common :: Arguments |"));
        assert!(!output.contains(". param ("));
    }

    #[test]
    fn exposes_requested_views() {
        let output = expand_to_string(parse_quote! {
            #[injectable(expose = "dyn Logger")]
            struct FileLogger;
        });
        assert!(output.contains(". expose :: < dyn Logger >"));
    }

    #[test]
    fn rejects_enums_and_tuple_structs() {
        assert!(expand(&parse_quote! { enum Mode { A, B } }).is_err());
        assert!(expand(&parse_quote! { struct Pair(u8, u8); }).is_err());
    }
}
