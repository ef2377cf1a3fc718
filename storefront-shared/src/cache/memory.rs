/// In-memory cache with TTLs
///
/// Stand-in for Redis in tests and local runs. Expiry uses
/// `tokio::time::Instant`, so paused-clock tests can advance time. Every
/// operation is logged as `"<op> <key>"` and the whole cache can be told to
/// fail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{CacheError, CacheResult, KeyValueCache};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, (String, Instant)>,
    calls: Vec<String>,
    failing: bool,
}

impl Inner {
    fn record(&mut self, op: &str, key: &str) -> CacheResult<()> {
        self.calls.push(format!("{} {}", op, key));
        if self.failing {
            return Err(CacheError::Backend(format!("{} failed", op)));
        }
        Ok(())
    }

    /// Drops `key` if it has expired
    fn purge(&mut self, key: &str) {
        if let Some((_, expires_at)) = self.entries.get(key) {
            if *expires_at <= Instant::now() {
                self.entries.remove(key);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every subsequent operation fails
    pub fn fail_all(&self) {
        self.lock().failing = true;
    }

    /// Operations so far, e.g. `"del refresh_token:..."`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Remaining TTL of a live key
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut inner = self.lock();
        inner.purge(key);
        inner
            .entries
            .get(key)
            .map(|(_, expires_at)| expires_at.saturating_duration_since(Instant::now()))
    }

    /// Current value of a live key, without logging
    pub fn peek(&self, key: &str) -> Option<String> {
        let mut inner = self.lock();
        inner.purge(key);
        inner.entries.get(key).map(|(value, _)| value.clone())
    }

    pub fn insert(&self, key: &str, value: &str, ttl: Duration) {
        self.lock()
            .entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut inner = self.lock();
        inner.record("get", key)?;
        inner.purge(key);
        Ok(inner.entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut inner = self.lock();
        inner.record("set_ex", key)?;
        inner
            .entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<bool> {
        let mut inner = self.lock();
        inner.record("del", key)?;
        inner.purge(key);
        Ok(inner.entries.remove(key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut inner = self.lock();
        inner.record("expire", key)?;
        inner.purge(key);
        match inner.entries.get_mut(key) {
            Some((_, expires_at)) => {
                *expires_at = Instant::now() + ttl;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> CacheResult<bool> {
        let inner = self.lock();
        Ok(!inner.failing)
    }
}
