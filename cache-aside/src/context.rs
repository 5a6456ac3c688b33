//! Call-scoped cache switches
//!
//! A [`CallContext`] lives for exactly one logical call. The inbound boundary
//! creates it, applies the resolved [`crate::boundary::CacheControl`], and
//! hands it down the call chain by reference. Nothing about it is global, so
//! concurrent calls on the same task pool never see each other's flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Per-call read/write switches
#[derive(Debug)]
pub struct CallContext {
    read_enabled: AtomicBool,
    write_enabled: AtomicBool,
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            read_enabled: AtomicBool::new(true),
            write_enabled: AtomicBool::new(true),
        }
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable cache reads for the rest of the call
    pub fn set_enabled(&self, enabled: bool) {
        self.read_enabled.store(enabled, Ordering::Release);
    }

    /// Whether cache reads are enabled (default `true`)
    pub fn is_enabled(&self) -> bool {
        self.read_enabled.load(Ordering::Acquire)
    }

    /// Enable or disable write-back for the rest of the call
    pub fn set_write_enabled(&self, enabled: bool) {
        self.write_enabled.store(enabled, Ordering::Release);
    }

    /// Whether results may be written back (default `true`)
    pub fn is_write_enabled(&self) -> bool {
        self.write_enabled.load(Ordering::Acquire)
    }

    /// Reset to defaults
    pub fn clear(&self) {
        self.read_enabled.store(true, Ordering::Release);
        self.write_enabled.store(true, Ordering::Release);
    }

    /// Guard that clears this context when dropped
    pub fn guard(self: &Arc<Self>) -> ContextGuard {
        ContextGuard {
            context: Arc::clone(self),
        }
    }
}

/// Clears its context on drop.
///
/// Covers normal return, early `?` return, panic unwind and a dropped
/// (cancelled) future alike.
#[derive(Debug)]
pub struct ContextGuard {
    context: Arc<CallContext>,
}

impl ContextGuard {
    pub fn context(&self) -> &Arc<CallContext> {
        &self.context
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.context.clear();
        debug!("Call context cleared");
    }
}
