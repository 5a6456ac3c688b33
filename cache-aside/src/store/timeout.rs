//! Deadline wrapper for slow backends

use super::CacheStore;
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounds every operation of the inner store by a fixed deadline.
///
/// An elapsed deadline becomes [`StoreError::Timeout`], which the
/// interceptor treats like any other store failure.
#[derive(Debug, Clone)]
pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: CacheStore> TimeoutStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} store `{}` did not answer within {:?}",
                    self.inner.name(),
                    op,
                    self.timeout
                );
                Err(StoreError::Timeout {
                    op,
                    after: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for TimeoutStore<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        self.bounded("set", self.inner.set(key, value, ttl)).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.bounded("delete", self.inner.delete(key)).await
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        self.bounded("delete_many", self.inner.delete_many(keys)).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.bounded("exists", self.inner.exists(key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.bounded("expire", self.inner.expire(key, ttl)).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        self.bounded("ttl", self.inner.ttl(key)).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
