//! Key-value store contract and implementations
//!
//! The interceptor only needs a handful of primitives. Everything here
//! returns [`StoreResult`]; callers decide whether an error matters.

pub mod config;
pub mod entry;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod timeout;

use crate::error::StoreResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use config::MemoryStoreConfig;
pub use entry::StoredEntry;
pub use memory::{start_auto_cleanup, MemoryStore, MemoryStoreStats};
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
pub use timeout::TimeoutStore;

/// Async key-value store with per-key expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the raw bytes stored under `key`
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Remove `key`; `true` if it existed
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Remove several keys; returns how many existed
    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        let mut removed = 0;
        for key in keys {
            if self.delete(key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Reset the expiry of an existing key; `false` if it does not exist
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Remaining lifetime, `None` if the key does not exist
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key).await
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        (**self).delete_many(keys).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        (**self).expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        (**self).ttl(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
