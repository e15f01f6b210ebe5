//! 解析上下文
//!
//! 容器递归构造依赖时，用解析链检测循环依赖并限制递归深度。

use infrastructure_common::{DependencyError, DependencyResult, NamingConventions};

/// 解析上下文
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// 当前解析链（限定名），用于检测循环依赖
    pub resolution_chain: Vec<String>,
    /// 解析选项
    pub options: ResolveOptions,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定选项创建解析上下文
    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            resolution_chain: Vec::new(),
            options,
        }
    }

    /// 添加类型到解析链
    pub fn push_type(&mut self, type_name: &str) -> DependencyResult<()> {
        if self
            .resolution_chain
            .iter()
            .any(|entry| NamingConventions::same_type(entry, type_name))
        {
            return Err(DependencyError::CircularDependency {
                dependency_chain: self.describe_with(type_name),
            });
        }
        if self.resolution_chain.len() >= self.options.max_depth {
            return Err(DependencyError::CircularDependency {
                dependency_chain: format!(
                    "超过最大解析深度 {}: {}",
                    self.options.max_depth,
                    self.describe_with(type_name)
                ),
            });
        }
        self.resolution_chain.push(type_name.to_string());
        Ok(())
    }

    /// 从解析链中移除类型
    pub fn pop_type(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }

    fn describe_with(&self, type_name: &str) -> String {
        self.resolution_chain
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(type_name))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// 最大递归深度
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_type_is_a_cycle() {
        let mut context = ResolveContext::new();
        context.push_type("App\\A").unwrap();
        context.push_type("App\\B").unwrap();

        let err = context.push_type("app\\a").unwrap_err();
        match err {
            DependencyError::CircularDependency { dependency_chain } => {
                assert_eq!(dependency_chain, "App\\A -> App\\B -> app\\a");
            }
            other => panic!("unexpected error: {other}"),
        }

        context.pop_type();
        assert_eq!(context.depth(), 1);
        assert!(context.push_type("App\\B").is_ok());
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut context = ResolveContext::with_options(ResolveOptions { max_depth: 2 });
        context.push_type("A").unwrap();
        context.push_type("B").unwrap();
        assert!(matches!(
            context.push_type("C"),
            Err(DependencyError::CircularDependency { .. })
        ));
    }
}
