//! API server for the cache-aside demo

use anyhow::Result;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use cache_aside::{
    CacheControl, CacheInterceptor, InterceptorConfig, MemoryStore, MemoryStoreConfig,
    Properties, TimeoutStore,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::service::{DemoService, SharedStore, UserRepository};

use super::middleware::{cache_scope, route_target};
use super::routes::{
    get_user_by_id, get_user_profile, health_check, search, stats, update_user, AppState,
};

/// Env var overriding [`ApiServerConfig::store_timeout`]
pub const ENV_STORE_TIMEOUT_MS: &str = "CACHE_ASIDE_STORE_TIMEOUT_MS";

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for the API server
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for every store call
    pub store_timeout: Duration,
    /// Use Redis instead of the in-process store
    pub redis_url: Option<String>,
    pub interceptor: InterceptorConfig,
    pub properties: Properties,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            store_timeout: store_timeout_from_env(),
            redis_url: std::env::var("REDIS_URL").ok(),
            interceptor: InterceptorConfig::default(),
            properties: Properties::from_env(),
        }
    }
}

/// `CACHE_ASIDE_STORE_TIMEOUT_MS`, or the default when unset or malformed
fn store_timeout_from_env() -> Duration {
    let Ok(raw) = std::env::var(ENV_STORE_TIMEOUT_MS) else {
        return DEFAULT_STORE_TIMEOUT;
    };

    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Duration::from_millis(ms),
        _ => {
            warn!(
                "Ignoring {}=`{}`: expected a positive number of milliseconds, using {:?}",
                ENV_STORE_TIMEOUT_MS, raw, DEFAULT_STORE_TIMEOUT
            );
            DEFAULT_STORE_TIMEOUT
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
}

impl ApiServer {
    /// Create a new API server with configuration
    pub fn new(config: ApiServerConfig) -> Self {
        Self { config }
    }

    async fn open_store(&self) -> Result<SharedStore> {
        #[cfg(feature = "redis")]
        {
            if let Some(url) = &self.config.redis_url {
                let redis = cache_aside::RedisStore::connect(url).await?;
                return Ok(Arc::new(TimeoutStore::new(redis, self.config.store_timeout)));
            }
        }

        #[cfg(not(feature = "redis"))]
        {
            if self.config.redis_url.is_some() {
                info!("REDIS_URL is set but the `redis` feature is off, using the memory store");
            }
        }

        let memory = Arc::new(MemoryStore::new(MemoryStoreConfig::default())?);
        memory.spawn_cleanup();
        Ok(Arc::new(TimeoutStore::new(memory, self.config.store_timeout)))
    }

    /// Build the router with all demo routes
    pub async fn router(&self) -> Result<Router> {
        let store = self.open_store().await?;
        let interceptor = CacheInterceptor::with_config(
            store,
            Arc::new(self.config.properties.clone()),
            self.config.interceptor.clone(),
        )?;
        let service = DemoService::new(
            Arc::new(interceptor),
            Arc::new(UserRepository::seeded()),
        )?;

        let app_state = Arc::new(AppState {
            service: Arc::new(service),
        });

        let app = Router::new()
            .route("/health", get(health_check))
            .route("/demo/stats", get(stats))
            .route(
                "/demo/users/:id",
                get(get_user_by_id)
                    .route_layer(from_fn_with_state(
                        route_target(Some(CacheControl::ENABLED)),
                        cache_scope,
                    ))
                    .put(update_user),
            )
            .route(
                "/demo/users/:id/uncached",
                get(get_user_by_id).route_layer(from_fn_with_state(
                    route_target(Some(CacheControl::DISABLED)),
                    cache_scope,
                )),
            )
            .route(
                "/demo/profile/:id",
                get(get_user_profile)
                    .route_layer(from_fn_with_state(route_target(None), cache_scope)),
            )
            .route(
                "/demo/search",
                post(search).route_layer(from_fn_with_state(route_target(None), cache_scope)),
            )
            .with_state(app_state)
            // Add CORS layer
            .layer(CorsLayer::permissive());

        Ok(app)
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        let app = self.router().await?;

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
