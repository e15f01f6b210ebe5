//! 缓存端口
//!
//! 类型图把完整的派生状态序列化后写入该端口，并在构造时读回。

use infrastructure_common::GraphResult;

/// 键值缓存端口
pub trait CacheStore: Send + Sync {
    /// 读取缓存值，不存在时返回 `None`
    fn get(&self, key: &str) -> GraphResult<Option<Vec<u8>>>;

    /// 写入缓存值，返回是否写入成功
    fn set(&self, key: &str, value: &[u8]) -> GraphResult<bool>;

    /// 获取缓存名称
    fn name(&self) -> &str;
}
