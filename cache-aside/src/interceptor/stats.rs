//! Interceptor counters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of what the interceptor has done so far
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads answered from the store with a value
    pub hits: u64,
    /// Reads answered from the store with an empty marker
    pub empty_hits: u64,
    pub misses: u64,
    /// Calls that skipped the read because the context disabled it
    pub context_bypasses: u64,
    /// Calls that skipped the read because an argument asked to refresh
    pub force_refresh_bypasses: u64,
    pub writes: u64,
    pub empty_writes: u64,
    /// Failed or timed out store calls, all absorbed
    pub store_errors: u64,
    /// Stored payloads that could not be decoded
    pub decode_errors: u64,
}

impl CacheStats {
    /// Hit rate over all reads, as a percentage. Empty hits count as hits.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits + self.empty_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn total_bypasses(&self) -> u64 {
        self.context_bypasses + self.force_refresh_bypasses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, empty_hits: {}, misses: {}, hit_rate: {:.2}%, bypasses: {}, writes: {}, store_errors: {} }}",
            self.hits,
            self.empty_hits,
            self.misses,
            self.hit_rate(),
            self.total_bypasses(),
            self.writes + self.empty_writes,
            self.store_errors
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct AtomicStats {
    pub hits: AtomicU64,
    pub empty_hits: AtomicU64,
    pub misses: AtomicU64,
    pub context_bypasses: AtomicU64,
    pub force_refresh_bypasses: AtomicU64,
    pub writes: AtomicU64,
    pub empty_writes: AtomicU64,
    pub store_errors: AtomicU64,
    pub decode_errors: AtomicU64,
}

impl AtomicStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            empty_hits: self.empty_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            context_bypasses: self.context_bypasses.load(Ordering::Relaxed),
            force_refresh_bypasses: self.force_refresh_bypasses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            empty_writes: self.empty_writes.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}
