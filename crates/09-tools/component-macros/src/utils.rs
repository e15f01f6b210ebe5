//! 宏工具函数

use quote::ToTokens;
use syn::Type;

/// 类型的紧凑文本形式，例如 `Option<String>`
pub fn type_label(ty: &Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let chars: Vec<char> = raw.chars().collect();
    let is_word = |ch: Option<&char>| ch.is_some_and(|c| c.is_alphanumeric() || *c == '_');

    let mut label = String::with_capacity(raw.len());
    for (i, &ch) in chars.iter().enumerate() {
        // 只保留两个标识符之间的空格，例如 `dyn Logger`
        if ch == ' ' && !(i > 0 && is_word(chars.get(i - 1)) && is_word(chars.get(i + 1))) {
            continue;
        }
        label.push(ch);
    }
    label
}

/// 检查类型是否为 Option<T>
pub fn is_option_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_type_label() {
        assert_eq!(type_label(&parse_quote!(String)), "String");
        assert_eq!(type_label(&parse_quote!(Option<Vec<u8>>)), "Option<Vec<u8>>");
        assert_eq!(type_label(&parse_quote!(std::sync::Arc<dyn Logger>)), "std::sync::Arc<dyn Logger>");
    }

    #[test]
    fn test_is_option_type() {
        assert!(is_option_type(&parse_quote!(Option<String>)));
        assert!(is_option_type(&parse_quote!(std::option::Option<u8>)));
        assert!(!is_option_type(&parse_quote!(String)));
        assert!(!is_option_type(&parse_quote!(&str)));
    }
}
