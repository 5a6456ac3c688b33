//! In-process store with TTL expiry and LRU eviction

use super::config::MemoryStoreConfig;
use super::entry::StoredEntry;
use super::CacheStore;
use crate::error::{CacheError, Result, StoreError, StoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Counters kept by [`MemoryStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStoreStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub size_bytes: usize,
    /// Evicted to respect `max_entries` / `max_size_bytes`
    pub evictions_size: u64,
    /// Dropped because their TTL ran out
    pub evictions_ttl: u64,
    pub deletions: u64,
}

impl MemoryStoreStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}

impl fmt::Display for MemoryStoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemoryStoreStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, size: {} bytes, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.size_bytes,
            self.total_evictions()
        )
    }
}

/// Reference [`CacheStore`] kept in process memory
///
/// - async access through a `tokio` `RwLock`
/// - per-entry expiry, checked on read and swept in the background
/// - LRU eviction once entry count or byte size limits are reached
pub struct MemoryStore {
    config: MemoryStoreConfig,
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    entries: HashMap<String, StoredEntry>,
    /// Front is least recently used
    lru_queue: VecDeque<String>,
    stats: MemoryStoreStats,
}

impl Inner {
    fn remove_entry(&mut self, key: &str) -> Option<StoredEntry> {
        let entry = self.entries.remove(key)?;
        self.lru_queue.retain(|k| k != key);
        self.stats.size_bytes = self.stats.size_bytes.saturating_sub(entry.size_bytes);
        self.stats.entries = self.entries.len();
        Some(entry)
    }

    fn touch(&mut self, key: &str) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.to_string());
    }

    /// Live entry under `key`; an expired one is dropped on the way
    fn live(&mut self, key: &str) -> Option<&mut StoredEntry> {
        if self.entries.get(key).map(StoredEntry::is_expired)? {
            debug!("Entry expired: {}", key);
            self.remove_entry(key);
            self.stats.evictions_ttl += 1;
            return None;
        }
        self.entries.get_mut(key)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_valid_config(MemoryStoreConfig::default())
    }
}

impl MemoryStore {
    /// Store with `config`, rejected with [`CacheError::ConfigError`] if it
    /// does not validate
    pub fn new(config: MemoryStoreConfig) -> Result<Self> {
        config.validate().map_err(CacheError::ConfigError)?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: MemoryStoreConfig) -> Self {
        info!("Initializing memory store with config: {:?}", config);

        Self {
            config,
            inner: Arc::new(RwLock::new(Inner {
                entries: HashMap::new(),
                lru_queue: VecDeque::new(),
                stats: MemoryStoreStats::default(),
            })),
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    pub async fn stats(&self) -> MemoryStoreStats {
        self.inner.read().await.stats.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.entries.len();
        inner.entries.clear();
        inner.lru_queue.clear();
        inner.stats.entries = 0;
        inner.stats.size_bytes = 0;
        inner.stats.deletions += count as u64;
        info!("Cleared {} entries from memory store", count);
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.write().await;

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove_entry(key);
        }
        inner.stats.evictions_ttl += expired.len() as u64;

        if !expired.is_empty() {
            debug!("Cleaned up {} expired entries", expired.len());
        }
        expired.len()
    }

    /// Start the background sweep if enabled in the config.
    ///
    /// The task holds only a weak handle and stops once the store is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enable_auto_cleanup {
            return None;
        }
        Some(tokio::spawn(start_auto_cleanup(Arc::downgrade(self))))
    }

    fn evict_if_needed(&self, inner: &mut Inner, needed_size: usize) {
        while inner.entries.len() >= self.config.max_entries {
            let Some(key) = inner.lru_queue.pop_front() else {
                break;
            };
            debug!("Evicting entry due to max_entries limit: {}", key);
            inner.remove_entry(&key);
            inner.stats.evictions_size += 1;
        }

        while inner.stats.size_bytes + needed_size > self.config.max_size_bytes {
            let Some(key) = inner.lru_queue.pop_front() else {
                break;
            };
            debug!("Evicting entry due to size limit: {}", key);
            inner.remove_entry(&key);
            inner.stats.evictions_size += 1;
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut inner = self.inner.write().await;

        let value = inner.live(key).map(|entry| {
            entry.mark_accessed();
            entry.value.clone()
        });

        match value {
            Some(value) => {
                inner.touch(key);
                inner.stats.hits += 1;
                Ok(Some(value))
            }
            None => {
                inner.stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let entry = StoredEntry::new(key, value.to_vec(), ttl);
        let size = entry.size_bytes;

        // checked before the old value goes, so a rejected write keeps it
        if size > self.config.max_size_bytes {
            warn!(
                "Entry of {} bytes exceeds store capacity of {} bytes",
                size, self.config.max_size_bytes
            );
            return Err(StoreError::Backend(format!(
                "entry of {} bytes exceeds store capacity",
                size
            )));
        }

        let mut inner = self.inner.write().await;
        inner.remove_entry(key);
        self.evict_if_needed(&mut inner, size);

        inner.entries.insert(key.to_string(), entry);
        inner.lru_queue.push_back(key.to_string());
        inner.stats.size_bytes += size;
        inner.stats.entries = inner.entries.len();

        debug!("Stored {} ({} bytes, ttl {:?})", key, size, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let existed = inner.live(key).is_some();
        if existed {
            inner.remove_entry(key);
            inner.stats.deletions += 1;
        }
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.live(key) {
            Some(entry) => {
                entry.reset_ttl(ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .get(key)
            .and_then(StoredEntry::time_until_expiration))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Background sweep of expired entries
pub async fn start_auto_cleanup(store: std::sync::Weak<MemoryStore>) {
    let interval = match store.upgrade() {
        Some(store) => store.config.cleanup_interval,
        None => return,
    };

    info!("Starting memory store cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        let Some(store) = store.upgrade() else {
            debug!("Memory store dropped, stopping cleanup task");
            break;
        };
        let removed = store.cleanup_expired().await;
        if removed > 0 {
            debug!("Auto cleanup removed {} entries", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let store = MemoryStore::new(MemoryStoreConfig::small()).unwrap();

        store
            .set("user:1", b"alice", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("user:1").await.unwrap(), Some(b"alice".to_vec()));
        assert_eq!(store.get("user:2").await.unwrap(), None);

        let stats = store.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let store = MemoryStore::default();
        store
            .set("k", b"v", Duration::from_millis(50))
            .await
            .unwrap();

        assert!(store.exists("k").await.unwrap());
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.stats().await.evictions_ttl, 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let store = MemoryStore::default();
        store.set("k", b"one", Duration::from_secs(60)).await.unwrap();
        store.set("k", b"two", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let config = MemoryStoreConfig::builder().max_entries(2).build();
        let store = MemoryStore::new(config).unwrap();

        store.set("a", b"1", Duration::from_secs(60)).await.unwrap();
        store.set("b", b"2", Duration::from_secs(60)).await.unwrap();
        // touch "a" so "b" becomes least recently used
        store.get("a").await.unwrap();
        store.set("c", b"3", Duration::from_secs(60)).await.unwrap();

        assert!(store.exists("a").await.unwrap());
        assert!(!store.exists("b").await.unwrap());
        assert!(store.exists("c").await.unwrap());
        assert_eq!(store.stats().await.evictions_size, 1);
    }

    #[tokio::test]
    async fn test_oversized_entry_rejected() {
        let config = MemoryStoreConfig::builder().max_size_bytes(16).build();
        let store = MemoryStore::new(config).unwrap();

        store.set("k", b"small", Duration::from_secs(60)).await.unwrap();
        let result = store.set("k", &[0u8; 64], Duration::from_secs(60)).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));

        // the rejected write leaves the previous value in place
        assert_eq!(store.get("k").await.unwrap(), Some(b"small".to_vec()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MemoryStoreConfig::builder()
            .cleanup_interval(Duration::ZERO)
            .build();
        assert!(matches!(
            MemoryStore::new(config),
            Err(CacheError::ConfigError(_))
        ));

        let config = MemoryStoreConfig::builder().max_entries(0).build();
        assert!(MemoryStore::new(config).is_err());

        let config = MemoryStoreConfig::builder()
            .cleanup_interval(Duration::ZERO)
            .enable_auto_cleanup(false)
            .build();
        let store = Arc::new(MemoryStore::new(config).unwrap());
        assert!(store.spawn_cleanup().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_delete_many() {
        let store = MemoryStore::default();
        for key in ["a", "b", "c"] {
            store.set(key, b"v", Duration::from_secs(60)).await.unwrap();
        }

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());

        let removed = store
            .delete_many(&["b".to_string(), "c".to_string(), "zz".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expire_and_ttl() {
        let store = MemoryStore::default();
        store.set("k", b"v", Duration::from_secs(10)).await.unwrap();

        assert!(store.expire("k", Duration::from_secs(600)).await.unwrap());
        let ttl = store.ttl("k").await.unwrap().unwrap();
        assert!(ttl > Duration::from_secs(500));

        assert!(!store.expire("missing", Duration::from_secs(1)).await.unwrap());
        assert_eq!(store.ttl("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemoryStore::default();
        store.set("short", b"v", Duration::from_millis(20)).await.unwrap();
        store.set("long", b"v", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_background_cleanup() {
        let config = MemoryStoreConfig::builder()
            .cleanup_interval(Duration::from_millis(20))
            .build();
        let store = Arc::new(MemoryStore::new(config).unwrap());
        let handle = store.spawn_cleanup().unwrap();

        store.set("k", b"v", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.is_empty().await);

        drop(store);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_stats_display() {
        let stats = MemoryStoreStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        let display = stats.to_string();
        assert!(display.contains("hits: 3"));
        assert!(display.contains("hit_rate: 75.00%"));
    }
}
