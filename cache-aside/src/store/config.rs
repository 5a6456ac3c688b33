//! Configuration for the in-process store

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits and housekeeping for [`super::MemoryStore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Maximum number of entries before LRU eviction kicks in
    pub max_entries: usize,

    /// Maximum total size of stored data in bytes
    pub max_size_bytes: usize,

    /// Sweep expired entries in the background
    pub enable_auto_cleanup: bool,

    /// Interval between background sweeps
    pub cleanup_interval: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            // 100 MB
            max_size_bytes: 100 * 1024 * 1024,
            enable_auto_cleanup: true,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl MemoryStoreConfig {
    pub fn builder() -> MemoryStoreConfigBuilder {
        MemoryStoreConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 {
            return Err("max_entries must be greater than 0".to_string());
        }

        if self.max_size_bytes == 0 {
            return Err("max_size_bytes must be greater than 0".to_string());
        }

        if self.enable_auto_cleanup && self.cleanup_interval.is_zero() {
            return Err("cleanup_interval must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Small footprint for tests and local tools
    pub fn small() -> Self {
        Self {
            max_entries: 1_000,
            max_size_bytes: 10 * 1024 * 1024,
            ..Default::default()
        }
    }
}

/// Builder for [`MemoryStoreConfig`]
#[derive(Debug, Default)]
pub struct MemoryStoreConfigBuilder {
    max_entries: Option<usize>,
    max_size_bytes: Option<usize>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
}

impl MemoryStoreConfigBuilder {
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    pub fn max_size_bytes(mut self, size: usize) -> Self {
        self.max_size_bytes = Some(size);
        self
    }

    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    pub fn build(self) -> MemoryStoreConfig {
        let defaults = MemoryStoreConfig::default();

        MemoryStoreConfig {
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            max_size_bytes: self.max_size_bytes.unwrap_or(defaults.max_size_bytes),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
        }
    }
}
