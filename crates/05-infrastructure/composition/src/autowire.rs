//! 自动装配核心入口

use crate::builder::AutowireBuilder;
use config_impl::AutowireSettings;
use di_abstractions::{DiContainer, TypeRegistry};
use di_impl::{Container, TypeGraph};
use infrastructure_common::{DependencyResult, GraphResult, Instance, Parameters};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 组装完成的类型图与容器
///
/// 两者共享同一个类型图；容器在运行期解析时可能触发类型图重载。
pub struct Autowire {
    graph: Arc<RwLock<TypeGraph>>,
    container: Arc<Container>,
    settings: AutowireSettings,
}

impl Autowire {
    /// 创建构建器
    pub fn builder() -> AutowireBuilder {
        AutowireBuilder::new()
    }

    pub(crate) fn new(
        graph: Arc<RwLock<TypeGraph>>,
        container: Arc<Container>,
        settings: AutowireSettings,
    ) -> Self {
        Self {
            graph,
            container,
            settings,
        }
    }

    /// 类型图
    pub fn graph(&self) -> &Arc<RwLock<TypeGraph>> {
        &self.graph
    }

    /// 容器
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// 生效的设置
    pub fn settings(&self) -> &AutowireSettings {
        &self.settings
    }

    /// 运行期追加扫描路径
    pub fn add_path(&self, path: impl AsRef<Path>) -> GraphResult<usize> {
        self.graph.write().add_path(path.as_ref())
    }

    /// 解析名称对应的具体类型
    pub fn find_concrete_type(&self, name: &str) -> GraphResult<String> {
        self.graph.write().find_concrete_type(name)
    }

    /// 获取（记忆化的）实例
    pub fn get_instance(&self, name: &str) -> DependencyResult<Instance> {
        self.container.get_instance(name, Parameters::new())
    }

    /// 获取实例并转换为 `Arc<T>`
    pub fn get<T>(&self, name: &str) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.container.get::<T>(name)
    }

    /// 重新扫描全部已注册路径
    pub fn reload(&self) -> GraphResult<usize> {
        let count = self.graph.write().reload()?;
        info!("类型图已重载: {} 个类型", count);
        Ok(count)
    }

    /// 立即持久化类型图
    pub fn flush(&self) -> GraphResult<()> {
        self.graph.read().flush()
    }
}

impl std::fmt::Debug for Autowire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autowire")
            .field("graph", &*self.graph.read())
            .field("container", &self.container)
            .finish()
    }
}
