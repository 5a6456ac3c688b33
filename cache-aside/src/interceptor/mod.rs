//! Cache-aside orchestration
//!
//! [`CacheInterceptor::invoke`] wraps one call of an expensive operation:
//!
//! ```text
//! START -> CONTEXT_CHECK -> BYPASS ------------------------> EXECUTE -> WRITE_BACK -> RETURN
//!                        \-> KEY_LOOKUP -> HIT -> RETURN      ^
//!                                      \-> MISS -------------/
//! ```
//!
//! Store failures never reach the caller. They are logged, counted and
//! handled as a miss (on read) or a skipped write. Key expansion failures
//! and the operation's own errors do reach the caller.

pub mod cached;
pub mod codec;
pub mod config;
pub mod stats;

pub use cached::Cached;
pub use codec::{Codec, JsonCodec, EMPTY_MARKER};
pub use config::InterceptorConfig;
pub use stats::CacheStats;

use crate::context::CallContext;
use crate::directive::CacheDirective;
use crate::error::{InvokeError, KeyExpansionError, Result};
use crate::key::{CallArguments, KeyExpander};
use crate::properties::{Properties, PropertySource};
use crate::store::CacheStore;
use crate::ttl::TtlPolicy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use stats::AtomicStats;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of reading a key
enum Lookup<T> {
    Hit(T),
    Empty,
    Miss,
}

/// Wraps operations with read-through/write-back caching against `S`
pub struct CacheInterceptor<S, C = JsonCodec> {
    store: S,
    codec: C,
    expander: KeyExpander,
    ttl_policy: TtlPolicy,
    config: InterceptorConfig,
    stats: AtomicStats,
}

impl<S: CacheStore> CacheInterceptor<S> {
    /// Interceptor with default config, no properties and the JSON codec
    pub fn new(store: S) -> Self {
        let properties: Arc<dyn PropertySource> = Arc::new(Properties::new());
        Self::build(store, JsonCodec, properties, InterceptorConfig::default())
    }

    /// Interceptor resolving `${...}` placeholders against `properties`
    pub fn with_config(
        store: S,
        properties: Arc<dyn PropertySource>,
        config: InterceptorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(store, JsonCodec, properties, config))
    }
}

impl<S: CacheStore, C: Codec> CacheInterceptor<S, C> {
    fn build(
        store: S,
        codec: C,
        properties: Arc<dyn PropertySource>,
        config: InterceptorConfig,
    ) -> Self {
        info!(
            "Initializing cache interceptor on {} store with config: {:?}",
            store.name(),
            config
        );

        Self {
            store,
            codec,
            expander: KeyExpander::new(Arc::clone(&properties)),
            ttl_policy: TtlPolicy::new(properties, config.empty_marker_ttl),
            config,
            stats: AtomicStats::default(),
        }
    }

    /// Swap the payload codec
    pub fn with_codec<C2: Codec>(self, codec: C2) -> CacheInterceptor<S, C2> {
        CacheInterceptor {
            store: self.store,
            codec,
            expander: self.expander,
            ttl_policy: self.ttl_policy,
            config: self.config,
            stats: self.stats,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn expander(&self) -> &KeyExpander {
        &self.expander
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl_policy
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// Counters accumulated since construction
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Render the key `directive` would use for `args`
    pub fn render_key(
        &self,
        directive: &CacheDirective,
        args: &CallArguments,
    ) -> std::result::Result<String, KeyExpansionError> {
        self.expander.expand(directive.key_template(), args)
    }

    /// Run `op` behind the cache.
    ///
    /// Returns the cached value on a hit without calling `op`. Otherwise
    /// calls `op` once and writes its result back, `None` as an empty marker.
    pub async fn invoke<T, E, F, Fut>(
        &self,
        ctx: &CallContext,
        directive: &CacheDirective,
        args: &CallArguments,
        op: F,
    ) -> std::result::Result<Option<T>, InvokeError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
    {
        if !ctx.is_enabled() {
            AtomicStats::incr(&self.stats.context_bypasses);
            info!(
                "Cache read disabled by call context for `{}`",
                directive.key_template()
            );

            if !self.config.write_back_when_disabled {
                return op().await.map_err(InvokeError::Operation);
            }

            let key = self.render_key(directive, args)?;
            let result = op().await.map_err(InvokeError::Operation)?;
            self.write_back(ctx, directive, &key, &result).await;
            return Ok(result);
        }

        let key = self.render_key(directive, args)?;

        if args.force_refresh_requested() {
            AtomicStats::incr(&self.stats.force_refresh_bypasses);
            info!("Force refresh requested, skipping read of {}", key);
        } else {
            match self.lookup::<T>(&key).await {
                Lookup::Hit(value) => return Ok(Some(value)),
                Lookup::Empty => return Ok(None),
                Lookup::Miss => {}
            }
        }

        let result = op().await.map_err(InvokeError::Operation)?;
        self.write_back(ctx, directive, &key, &result).await;
        Ok(result)
    }

    /// Delete the entry `directive` maps `args` to.
    ///
    /// Advisory: a store failure is logged and reported as `false`.
    pub async fn evict(
        &self,
        directive: &CacheDirective,
        args: &CallArguments,
    ) -> std::result::Result<bool, KeyExpansionError> {
        let key = self.render_key(directive, args)?;

        match self.store.delete(&key).await {
            Ok(existed) => {
                debug!("Evicted {} (existed: {})", key, existed);
                Ok(existed)
            }
            Err(e) => {
                AtomicStats::incr(&self.stats.store_errors);
                warn!("Failed to evict {} from {} store: {}", key, self.store.name(), e);
                Ok(false)
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        match self.store.get(key).await {
            Ok(Some(bytes)) if bytes.as_slice() == EMPTY_MARKER => {
                AtomicStats::incr(&self.stats.empty_hits);
                debug!("Cache hit (empty marker): {}", key);
                Lookup::Empty
            }
            Ok(Some(bytes)) => match self.codec.decode::<T>(&bytes) {
                Ok(value) => {
                    AtomicStats::incr(&self.stats.hits);
                    debug!("Cache hit: {}", key);
                    Lookup::Hit(value)
                }
                Err(e) => {
                    AtomicStats::incr(&self.stats.decode_errors);
                    AtomicStats::incr(&self.stats.misses);
                    warn!("Cached payload for {} could not be decoded, treating as miss: {}", key, e);
                    Lookup::Miss
                }
            },
            Ok(None) => {
                AtomicStats::incr(&self.stats.misses);
                debug!("Cache miss: {}", key);
                Lookup::Miss
            }
            Err(e) => {
                AtomicStats::incr(&self.stats.store_errors);
                AtomicStats::incr(&self.stats.misses);
                warn!(
                    "Read of {} from {} store failed, treating as miss: {}",
                    key,
                    self.store.name(),
                    e
                );
                Lookup::Miss
            }
        }
    }

    async fn write_back<T: Serialize>(
        &self,
        ctx: &CallContext,
        directive: &CacheDirective,
        key: &str,
        result: &Option<T>,
    ) {
        if !ctx.is_write_enabled() {
            debug!("Write-back disabled by call context for {}", key);
            return;
        }

        let (bytes, ttl) = match result {
            Some(value) => match self.codec.encode(value) {
                Ok(bytes) => (bytes, self.ttl_policy.resolve(directive)),
                Err(e) => {
                    warn!("Result for {} could not be encoded, not caching: {}", key, e);
                    return;
                }
            },
            None => (EMPTY_MARKER.to_vec(), self.ttl_policy.empty_marker_ttl()),
        };

        match self.store.set(key, &bytes, ttl).await {
            Ok(()) => {
                if result.is_some() {
                    AtomicStats::incr(&self.stats.writes);
                    debug!("Cached {} for {:?}", key, ttl);
                } else {
                    AtomicStats::incr(&self.stats.empty_writes);
                    debug!("Cached empty marker {} for {:?}", key, ttl);
                }
            }
            Err(e) => {
                AtomicStats::incr(&self.stats.store_errors);
                warn!("Write of {} to {} store failed: {}", key, self.store.name(), e);
            }
        }
    }
}
