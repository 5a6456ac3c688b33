//! # cache-aside
//!
//! A cache-aside decoration layer for async Rust. Expensive read operations
//! are wrapped with a key-value cache without the operation knowing about it.
//!
//! ## Features
//!
//! - Key templates rendered from named call arguments, with `${...}` config
//!   placeholders and an order-independent `hash()` for structured values
//! - TTLs from a base count, an optional config-driven override and random
//!   jitter against synchronized expiry
//! - Call-scoped switches to bypass reads (or writes) for a single call
//! - Per-argument force refresh
//! - Short-lived empty markers for `None` results
//! - Store failures degrade to a miss; they never fail the call
//!
//! ## Example
//!
//! ```rust
//! use cache_aside::{CacheDirective, CacheInterceptor, CallArguments, CallContext, MemoryStore};
//! use cache_aside::TimeUnit;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let interceptor = CacheInterceptor::new(MemoryStore::default());
//!
//! let directive = CacheDirective::builder("'user:info:' + #id")
//!     .ttl(30)
//!     .time_unit(TimeUnit::Minutes)
//!     .build()?;
//!
//! let ctx = CallContext::new();
//! let args = CallArguments::new().bind("id", &1001)?;
//!
//! let name: Option<String> = interceptor
//!     .invoke(&ctx, &directive, &args, || async {
//!         // expensive lookup
//!         Ok::<_, std::io::Error>(Some("alice".to_string()))
//!     })
//!     .await?;
//!
//! assert_eq!(name.as_deref(), Some("alice"));
//! assert_eq!(interceptor.stats().misses, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Call scopes
//!
//! Entry points open a scope with [`boundary::run_in_call_scope`]. The
//! resolved [`CacheControl`] is applied to a fresh [`CallContext`], which is
//! cleared however the call ends:
//!
//! ```rust
//! use cache_aside::{run_in_call_scope, CacheControl, ControlTarget};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let target = ControlTarget::new().method(CacheControl::DISABLED);
//! let enabled = run_in_call_scope(&target, |ctx| async move { ctx.is_enabled() }).await;
//! assert!(!enabled);
//! # }
//! ```

pub mod boundary;
pub mod context;
pub mod directive;
pub mod error;
pub mod interceptor;
pub mod key;
pub mod properties;
pub mod store;
pub mod ttl;

// Re-export main types for convenience
pub use boundary::{run_in_call_scope, CacheControl, ControlTarget};
pub use context::{CallContext, ContextGuard};
pub use directive::{CacheDirective, CacheDirectiveBuilder, TimeUnit};
pub use error::{
    CacheError, InvokeError, KeyExpansionError, Result, StoreError, StoreResult, TtlParseError,
};
pub use interceptor::{
    CacheInterceptor, CacheStats, Cached, Codec, InterceptorConfig, JsonCodec, EMPTY_MARKER,
};
pub use key::{CallArguments, ForceRefresh, KeyExpander};
pub use properties::{Properties, PropertySource};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use store::{CacheStore, MemoryStore, MemoryStoreConfig, TimeoutStore};
pub use ttl::TtlPolicy;
