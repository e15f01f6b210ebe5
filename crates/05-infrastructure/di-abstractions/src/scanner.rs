//! 声明扫描器抽象接口
//!
//! 扫描器只做词法层面的分析：识别命名空间、导入别名和类型声明及其父类型列表，
//! 不加载也不执行源文件。

use infrastructure_common::{DeclarationInfo, ScanResult};
use std::path::{Path, PathBuf};

/// 声明扫描器 trait
pub trait DeclarationScanner: Send + Sync {
    /// 扫描一个源文件的文本，返回其中声明的全部类型
    fn scan(&self, source: &str) -> ScanResult<Vec<DeclarationInfo>>;

    /// 获取扫描器名称
    fn name(&self) -> &str;
}

/// 扫描目标类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// 扫描指定的目录（递归）
    Directory(PathBuf),
    /// 扫描指定的文件
    File(PathBuf),
}

impl ScanTarget {
    /// 获取扫描目标的路径
    pub fn path(&self) -> &Path {
        match self {
            ScanTarget::Directory(path) | ScanTarget::File(path) => path,
        }
    }
}

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 源文件扩展名白名单（不带点，小写）
    pub extensions: Vec<String>,
    /// 是否跟随符号链接
    pub follow_links: bool,
}

impl ScanOptions {
    /// 使用指定扩展名创建扫描选项
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
            ..Self::default()
        }
    }

    /// 文件是否匹配扩展名白名单
    pub fn matches(&self, path: &Path) -> bool {
        matches_extension(path, &self.extensions)
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["php".to_string()],
            follow_links: false,
        }
    }
}

/// 规范化扩展名：去掉前导点并转小写
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// 文件扩展名是否在白名单中
pub fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
}
