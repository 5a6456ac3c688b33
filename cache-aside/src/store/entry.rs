//! Stored entries with expiry bookkeeping

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Bytes held by [`super::MemoryStore`] plus the metadata it needs for
/// expiry and LRU accounting
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub value: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub access_count: u64,
    pub size_bytes: usize,
}

fn expiry_from_now(ttl: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl StoredEntry {
    pub fn new(key: &str, value: Vec<u8>, ttl: Duration) -> Self {
        let now = Utc::now();
        let size_bytes = key.len() + value.len() + std::mem::size_of::<Self>();

        Self {
            value,
            created_at: now,
            accessed_at: now,
            expires_at: expiry_from_now(ttl),
            access_count: 0,
            size_bytes,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Remaining lifetime, `None` once expired
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now();
        if now >= self.expires_at {
            None
        } else {
            (self.expires_at - now).to_std().ok()
        }
    }

    pub fn mark_accessed(&mut self) {
        self.accessed_at = Utc::now();
        self.access_count += 1;
    }

    /// Restart the expiry clock with a new TTL
    pub fn reset_ttl(&mut self, ttl: Duration) {
        self.expires_at = expiry_from_now(ttl);
    }

    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = StoredEntry::new("user:1", b"{}".to_vec(), Duration::from_secs(3600));
        assert!(!entry.is_expired());
        assert_eq!(entry.access_count, 0);
        assert!(entry.size_bytes >= "user:1".len() + 2);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = StoredEntry::new("k", b"v".to_vec(), Duration::from_millis(50));
        assert!(entry.time_until_expiration().is_some());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
        assert!(entry.time_until_expiration().is_none());
    }

    #[test]
    fn test_reset_ttl() {
        let mut entry = StoredEntry::new("k", b"v".to_vec(), Duration::from_millis(10));
        entry.reset_ttl(Duration::from_secs(60));
        sleep(Duration::from_millis(20));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_mark_accessed() {
        let mut entry = StoredEntry::new("k", b"v".to_vec(), Duration::from_secs(60));
        let before = entry.accessed_at;
        sleep(Duration::from_millis(5));
        entry.mark_accessed();
        assert_eq!(entry.access_count, 1);
        assert!(entry.accessed_at > before);
        assert!(entry.age() >= Duration::from_millis(5));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = StoredEntry::new("k", b"v".to_vec(), Duration::from_secs(u64::MAX));
        assert!(!entry.is_expired());
    }
}
