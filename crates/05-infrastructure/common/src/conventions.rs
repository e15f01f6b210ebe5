//! 命名约定
//!
//! 类型名不区分大小写，命名空间分隔符为 `\`。所有查找都基于规范化后的键，
//! 因此 `\Foo\Bar`、`foo\bar`、`FOO\BAR` 指向同一条记录。

/// 命名空间分隔符
pub const NAMESPACE_SEPARATOR: char = '\\';

/// 命名约定规范
#[derive(Debug)]
pub struct NamingConventions;

impl NamingConventions {
    /// 规范化查找键：去掉首尾分隔符、折叠重复分隔符、`/` 视为分隔符、转小写
    pub fn normalize_key(name: &str) -> String {
        Self::canonical_name(name).to_lowercase()
    }

    /// 规范化限定名：保留大小写，去掉前导分隔符
    pub fn canonical_name(name: &str) -> String {
        name.trim()
            .split(|c| c == NAMESPACE_SEPARATOR || c == '/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("\\")
    }

    /// 获取简短名称（最后一段）
    pub fn short_name(name: &str) -> &str {
        let trimmed = name.trim_end_matches(NAMESPACE_SEPARATOR);
        trimmed
            .rsplit(NAMESPACE_SEPARATOR)
            .next()
            .unwrap_or(trimmed)
    }

    /// 名称是否已完全限定（以根分隔符开头）
    pub fn is_fully_qualified(name: &str) -> bool {
        name.starts_with(NAMESPACE_SEPARATOR)
    }

    /// 在命名空间下拼接名称，命名空间可以为空
    pub fn join(namespace: &str, name: &str) -> String {
        let namespace = namespace.trim_matches(NAMESPACE_SEPARATOR);
        let name = name.trim_matches(NAMESPACE_SEPARATOR);
        if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}\\{name}")
        }
    }

    /// 两个名称是否指向同一类型
    pub fn same_type(left: &str, right: &str) -> bool {
        Self::normalize_key(left) == Self::normalize_key(right)
    }

    /// 方法名是否符合 setter 约定，例如 `set_logger` / `setLogger`
    pub fn is_setter_name(method: &str, prefix: &str) -> bool {
        method.len() > prefix.len()
            && method
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }
}
