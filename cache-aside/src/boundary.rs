//! Inbound boundary contract
//!
//! An entry point (HTTP handler, queue consumer, CLI command) declares a
//! [`CacheControl`] for itself and optionally for the type that owns it. The
//! boundary resolves the effective control, opens a fresh [`CallContext`],
//! runs the call and clears the context however the call ends.

use crate::context::{CallContext, ContextGuard};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Cache switches declared on an entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    /// Cache reads allowed
    pub enabled: bool,
    /// Reads allowed but nothing is written back
    pub read_only: bool,
}

impl Default for CacheControl {
    fn default() -> Self {
        Self::ENABLED
    }
}

impl CacheControl {
    pub const ENABLED: CacheControl = CacheControl {
        enabled: true,
        read_only: false,
    };

    pub const DISABLED: CacheControl = CacheControl {
        enabled: false,
        read_only: false,
    };

    pub const READ_ONLY: CacheControl = CacheControl {
        enabled: true,
        read_only: true,
    };

    /// Write this control into a context
    pub fn apply(&self, ctx: &CallContext) {
        ctx.set_enabled(self.enabled);
        ctx.set_write_enabled(!self.read_only);
    }
}

/// Controls declared at the two levels an entry point can carry them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlTarget {
    /// Declared on the entry point itself
    pub method: Option<CacheControl>,
    /// Declared on the type (controller, service) that owns it
    pub owner: Option<CacheControl>,
}

impl ControlTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, control: CacheControl) -> Self {
        self.method = Some(control);
        self
    }

    pub fn owner(mut self, control: CacheControl) -> Self {
        self.owner = Some(control);
        self
    }

    /// Method level wins over owner level, which wins over the default
    pub fn resolve(&self) -> CacheControl {
        self.method.or(self.owner).unwrap_or_default()
    }

    /// Open a context with the resolved control applied.
    ///
    /// The context is cleared when the returned guard drops.
    pub fn enter(&self) -> ContextGuard {
        let ctx = Arc::new(CallContext::new());
        let control = self.resolve();
        control.apply(&ctx);
        debug!(
            "Call scope opened (enabled={}, read_only={})",
            control.enabled, control.read_only
        );
        ctx.guard()
    }
}

/// Run `call` inside a fresh call scope governed by `target`.
///
/// The context handed to `call` is cleared on return, error, panic and
/// cancellation of the returned future.
pub async fn run_in_call_scope<F, Fut, T>(target: &ControlTarget, call: F) -> T
where
    F: FnOnce(Arc<CallContext>) -> Fut,
    Fut: Future<Output = T>,
{
    let guard = target.enter();
    call(Arc::clone(guard.context())).await
}
