use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// The Redis primitives reliable delivery is built from. Values pushed to
/// lists and stored in sets are UTF-8 strings; payloads are raw bytes.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// `INCR`: returns the incremented value, starting at 1.
    async fn incr(&self, key: &str) -> Result<u64>;

    /// `SETEX`: `ttl` is rounded up to whole seconds and must be non-zero.
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn sadd(&self, key: &str, member: &str) -> Result<()>;

    async fn srem(&self, key: &str, member: &str) -> Result<()>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    async fn rpush(&self, key: &str, value: &str) -> Result<()>;

    async fn lpop(&self, key: &str) -> Result<Option<String>>;

    /// `BLPOP` on a single key. `None` waits forever; an elapsed timeout
    /// yields `Ok(None)`.
    async fn blpop(&self, key: &str, timeout: Option<Duration>) -> Result<Option<String>>;

    async fn llen(&self, key: &str) -> Result<u64>;

    /// Returns the number of keys that existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Every key matching a Redis glob pattern.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;
}

pub trait ConfigProvider: Send + Sync {
    fn redis_url(&self) -> String;
    fn namespace(&self) -> &str;
    fn default_ttl(&self) -> Duration;
}
