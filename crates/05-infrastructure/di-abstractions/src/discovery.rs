//! 源文件发现端口
//!
//! 类型图通过该端口枚举、读取源文件并计算内容哈希，不直接访问磁盘。

use infrastructure_common::GraphResult;
use std::path::{Path, PathBuf};

/// 源文件系统端口
pub trait SourceFileSystem: Send + Sync {
    /// 递归列出目录下匹配扩展名白名单的文件，按路径排序
    fn list_source_files(&self, dir: &Path, extensions: &[String]) -> GraphResult<Vec<PathBuf>>;

    /// 读取文件内容
    fn read_source(&self, path: &Path) -> GraphResult<String>;

    /// 计算文件内容哈希
    fn content_hash(&self, path: &Path) -> GraphResult<String>;

    /// 路径是否存在
    fn exists(&self, path: &Path) -> bool;

    /// 路径是否为目录
    fn is_dir(&self, path: &Path) -> bool;

    /// 目录的直接子项数量
    fn child_count(&self, dir: &Path) -> GraphResult<usize>;

    /// 获取文件系统名称
    fn name(&self) -> &str;
}
