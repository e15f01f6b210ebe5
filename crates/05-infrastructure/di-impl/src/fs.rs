//! 源文件系统实现
//!
//! [`LocalFileSystem`] 访问磁盘，[`MemoryFileSystem`] 把源文件保存在内存中，
//! 供测试和嵌入虚拟源码的宿主使用。两者使用相同的 SHA-256 内容哈希。

use di_abstractions::{matches_extension, SourceFileSystem};
use infrastructure_common::{GraphError, GraphResult};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// 计算内容的 SHA-256 十六进制摘要
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// 本地磁盘文件系统
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    follow_links: bool,
}

impl LocalFileSystem {
    /// 创建本地文件系统
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置是否跟随符号链接
    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }
}

impl SourceFileSystem for LocalFileSystem {
    fn list_source_files(&self, dir: &Path, extensions: &[String]) -> GraphResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(GraphError::file_system(dir, "目录不存在"));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("跳过无法访问的路径: {}", err);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| matches_extension(path, extensions))
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_source(&self, path: &Path) -> GraphResult<String> {
        let bytes = std::fs::read(path).map_err(|err| GraphError::file_system(path, err))?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(content),
            Err(err) => {
                // 声明只由 ASCII 组成，非法字节替换后不影响扫描
                warn!("源文件不是合法的 UTF-8，按替换字符读取: {}", path.display());
                Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
            }
        }
    }

    fn content_hash(&self, path: &Path) -> GraphResult<String> {
        let content = std::fs::read(path).map_err(|err| GraphError::file_system(path, err))?;
        Ok(hash_content(&content))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn child_count(&self, dir: &Path) -> GraphResult<usize> {
        let entries = std::fs::read_dir(dir).map_err(|err| GraphError::file_system(dir, err))?;
        Ok(entries.filter_map(Result::ok).count())
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// 内存文件系统
///
/// 目录由文件路径隐式构成。
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    /// 创建空的内存文件系统
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加文件（构建器形式）
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// 写入或覆盖文件
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files
            .write()
            .insert(normalize_path(&path.into()), content.into());
    }

    /// 删除文件，返回文件是否存在
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        self.files
            .write()
            .remove(&normalize_path(path.as_ref()))
            .is_some()
    }

    /// 文件数量
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// 是否没有文件
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn with_content<T>(&self, path: &Path, read: impl FnOnce(&str) -> T) -> GraphResult<T> {
        let files = self.files.read();
        files
            .get(&normalize_path(path))
            .map(|content| read(content))
            .ok_or_else(|| GraphError::file_system(path, "文件不存在"))
    }
}

impl SourceFileSystem for MemoryFileSystem {
    fn list_source_files(&self, dir: &Path, extensions: &[String]) -> GraphResult<Vec<PathBuf>> {
        if !self.is_dir(dir) {
            return Err(GraphError::file_system(dir, "目录不存在"));
        }
        let dir = normalize_path(dir);
        Ok(self
            .files
            .read()
            .keys()
            .filter(|path| path.starts_with(&dir) && **path != dir)
            .filter(|path| matches_extension(path, extensions))
            .cloned()
            .collect())
    }

    fn read_source(&self, path: &Path) -> GraphResult<String> {
        self.with_content(path, ToString::to_string)
    }

    fn content_hash(&self, path: &Path) -> GraphResult<String> {
        self.with_content(path, |content| hash_content(content.as_bytes()))
    }

    fn exists(&self, path: &Path) -> bool {
        let path = normalize_path(path);
        self.files.read().keys().any(|file| file.starts_with(&path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = normalize_path(path);
        self.files
            .read()
            .keys()
            .any(|file| file.starts_with(&path) && *file != path)
    }

    fn child_count(&self, dir: &Path) -> GraphResult<usize> {
        let dir = normalize_path(dir);
        let children: BTreeSet<_> = self
            .files
            .read()
            .keys()
            .filter_map(|file| file.strip_prefix(&dir).ok())
            .filter_map(|relative| relative.components().next())
            .map(|component| component.as_os_str().to_os_string())
            .collect();
        Ok(children.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// 去掉 `.` 段并折叠 `..`，使 `src/./a.php` 与 `src/a.php` 指向同一文件
///
/// `..` 只抵消前面的普通段；相对路径开头多出的 `..` 原样保留，
/// 根目录之上的 `..` 被丢弃。
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn php() -> Vec<String> {
        vec!["php".to_string()]
    }

    #[test]
    fn memory_file_system_implies_directories() {
        let fs = MemoryFileSystem::new()
            .with_file("/src/App/Kernel.php", "<?php class Kernel {}")
            .with_file("/src/App/Http/Router.php", "<?php class Router {}")
            .with_file("/src/readme.md", "# docs");

        assert!(fs.is_dir(Path::new("/src")));
        assert!(fs.is_dir(Path::new("/src/App")));
        assert!(!fs.is_dir(Path::new("/src/App/Kernel.php")));
        assert!(fs.exists(Path::new("/src/App/Kernel.php")));
        assert!(!fs.exists(Path::new("/lib")));
        assert_eq!(fs.child_count(Path::new("/src")).unwrap(), 2);
        assert_eq!(fs.child_count(Path::new("/src/App")).unwrap(), 2);

        let files = fs.list_source_files(Path::new("/src"), &php()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/src/App/Http/Router.php"),
                PathBuf::from("/src/App/Kernel.php")
            ]
        );
    }

    #[test]
    fn content_hash_changes_with_content() {
        let fs = MemoryFileSystem::new().with_file("/a.php", "one");
        let before = fs.content_hash(Path::new("/a.php")).unwrap();
        assert_eq!(before, hash_content(b"one"));
        fs.insert("/a.php", "two");
        assert_ne!(fs.content_hash(Path::new("/a.php")).unwrap(), before);
        assert!(fs.remove("/./a.php"));
        assert!(fs.read_source(Path::new("/a.php")).is_err());
    }

    #[test]
    fn parent_segments_fold_only_over_named_segments() {
        assert_eq!(normalize_path(Path::new("../shared/src")), PathBuf::from("../shared/src"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new("../../x/./y/..")), PathBuf::from("../../x"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("/src/./App/../a.php")), PathBuf::from("/src/a.php"));
        assert_ne!(
            normalize_path(Path::new("../shared/src")),
            normalize_path(Path::new("shared/src"))
        );
    }

    #[test]
    fn local_file_system_replaces_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Latin1.php");
        std::fs::write(&path, b"<?php\n// caf\xe9\nclass Latin1 {}\n").unwrap();

        let content = LocalFileSystem::new().read_source(&path).unwrap();
        assert!(content.contains("caf\u{FFFD}"));
        assert!(content.contains("class Latin1 {}"));
    }

    #[test]
    fn local_file_system_walks_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/B.php"), "<?php class B {}").unwrap();
        std::fs::write(dir.path().join("A.PHP"), "<?php class A {}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "class C {}").unwrap();

        let fs = LocalFileSystem::new();
        let files = fs.list_source_files(dir.path(), &php()).unwrap();
        assert_eq!(files, vec![dir.path().join("A.PHP"), dir.path().join("nested/B.php")]);
        assert_eq!(fs.child_count(dir.path()).unwrap(), 3);
        assert_eq!(
            fs.content_hash(&dir.path().join("A.PHP")).unwrap(),
            hash_content(b"<?php class A {}")
        );
        assert!(fs.list_source_files(&dir.path().join("missing"), &php()).is_err());
    }
}
