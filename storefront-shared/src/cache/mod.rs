/// Key-value cache for sessions and OAuth state
///
/// The cache is not the system of record: it holds refresh-token entries
/// (`refresh_token:{user_id}`) and one-shot OAuth state values
/// (`oauth_state:{state}`), both with TTLs. Services use it through
/// [`KeyValueCache`], implemented by Redis in production and by
/// [`memory::MemoryCache`] in tests.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use storefront_shared::cache::client::{RedisClient, RedisConfig};
/// use storefront_shared::cache::KeyValueCache;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// client.set_ex("greeting", "hello", Duration::from_secs(60)).await?;
/// assert_eq!(client.get("greeting").await?.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use async_trait::async_trait;

pub mod client;
pub mod memory;
pub mod session;

pub use client::{RedisClient, RedisClientError, RedisConfig};
pub use memory::MemoryCache;
pub use session::{RefreshTokenEntry, SessionCache};

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Redis(#[from] RedisClientError),

    /// Stored value could not be encoded or decoded
    #[error("Cache value serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure raised by a non-Redis backend
    #[error("Cache backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Minimal string cache: `GET`, `SET EX`, `DEL`, `EXPIRE`, `PING`
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Returns true when a key was removed
    async fn del(&self, key: &str) -> CacheResult<bool>;

    /// Returns true when the key exists and got the new TTL
    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    async fn ping(&self) -> CacheResult<bool>;
}

/// Whole seconds for Redis, never zero (`SET EX 0` is an error)
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_secs_rounds_up_to_one() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(600)), 600);
    }
}
