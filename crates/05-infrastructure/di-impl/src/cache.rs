//! 缓存端口实现

use dashmap::DashMap;
use di_abstractions::CacheStore;
use infrastructure_common::{GraphError, GraphResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 进程内缓存
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryCache {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 删除条目
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> GraphResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> GraphResult<bool> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// 文件缓存：每个键一个文件
#[derive(Debug, Clone)]
pub struct FileCache {
    directory: PathBuf,
}

impl FileCache {
    /// 在指定目录下创建文件缓存，目录在首次写入时创建
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// 缓存目录
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 键对应的缓存文件路径
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{file_name}.cache"))
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> GraphResult<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(GraphError::cache(format!("{}: {}", path.display(), err))),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> GraphResult<bool> {
        std::fs::create_dir_all(&self.directory).map_err(|err| {
            GraphError::cache(format!("{}: {}", self.directory.display(), err))
        })?;

        // 先写临时文件再重命名，读者不会看到写了一半的内容
        let path = self.path_for(key);
        let staging = path.with_extension("cache.tmp");
        std::fs::write(&staging, value)
            .and_then(|()| std::fs::rename(&staging, &path))
            .map_err(|err| GraphError::cache(format!("{}: {}", path.display(), err)))?;
        debug!("缓存已写入: {} ({} 字节)", path.display(), value.len());
        Ok(true)
    }

    fn name(&self) -> &str {
        "file"
    }
}
