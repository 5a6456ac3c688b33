//! Demo user service whose lookups are cached through the interceptor

use cache_aside::{
    CacheDirective, CacheError, CacheInterceptor, CacheStore, CallArguments, CallContext,
    ForceRefresh, InvokeError, KeyExpansionError, TimeUnit,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Store handle shared by the service and the server
pub type SharedStore = Arc<dyn CacheStore>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: u64,
    pub name: String,
    pub city: String,
}

/// Search filter. `force_refresh` only steers caching and is not part of
/// the cache key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchRequest {
    pub username: Option<String>,
    pub city: Option<String>,
    #[serde(default, skip_serializing)]
    pub force_refresh: bool,
}

impl ForceRefresh for UserSearchRequest {
    fn skip_cache(&self) -> bool {
        self.force_refresh
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("search needs at least a username or a city")]
    EmptyFilter,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Key(#[from] KeyExpansionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<InvokeError<RepositoryError>> for ServiceError {
    fn from(e: InvokeError<RepositoryError>) -> Self {
        match e {
            InvokeError::Key(e) => ServiceError::Key(e),
            InvokeError::Operation(e) => ServiceError::Repository(e),
        }
    }
}

/// Stand-in for a database table; counts every query it answers
#[derive(Debug, Default)]
pub struct UserRepository {
    users: RwLock<BTreeMap<u64, UserDto>>,
    queries: AtomicU64,
}

impl UserRepository {
    pub fn seeded() -> Self {
        let users = [
            (1, "alice", "shanghai"),
            (2, "bob", "beijing"),
            (3, "carol", "shanghai"),
            (1001, "dave", "shenzhen"),
        ]
        .into_iter()
        .map(|(id, name, city)| {
            (
                id,
                UserDto {
                    id,
                    name: name.to_string(),
                    city: city.to_string(),
                },
            )
        })
        .collect();

        Self {
            users: RwLock::new(users),
            queries: AtomicU64::new(0),
        }
    }

    /// Number of queries answered so far
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub async fn find_by_id(&self, id: u64) -> Result<Option<UserDto>, RepositoryError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        info!("Querying repository for user id: {}", id);
        Ok(self.users.read().await.get(&id).cloned())
    }

    pub async fn search(
        &self,
        request: &UserSearchRequest,
    ) -> Result<Option<Vec<UserDto>>, RepositoryError> {
        if request.username.is_none() && request.city.is_none() {
            return Err(RepositoryError::EmptyFilter);
        }
        self.queries.fetch_add(1, Ordering::Relaxed);
        info!("Searching repository with {:?}", request);

        let users = self.users.read().await;
        let found: Vec<UserDto> = users
            .values()
            .filter(|u| request.username.as_ref().map_or(true, |n| &u.name == n))
            .filter(|u| request.city.as_ref().map_or(true, |c| &u.city == c))
            .cloned()
            .collect();

        Ok(if found.is_empty() { None } else { Some(found) })
    }

    pub async fn upsert(&self, user: UserDto) {
        self.users.write().await.insert(user.id, user);
    }
}

/// User lookups behind the cache
pub struct DemoService {
    interceptor: Arc<CacheInterceptor<SharedStore>>,
    repository: Arc<UserRepository>,
    user_by_id: CacheDirective,
    user_profile: CacheDirective,
    user_search: CacheDirective,
}

impl DemoService {
    pub fn new(
        interceptor: Arc<CacheInterceptor<SharedStore>>,
        repository: Arc<UserRepository>,
    ) -> Result<Self, CacheError> {
        Ok(Self {
            interceptor,
            repository,
            user_by_id: CacheDirective::builder("'user:info:' + #id")
                .ttl(30)
                .time_unit(TimeUnit::Minutes)
                .build()?,
            user_profile: CacheDirective::builder("'${app.cache.prefix}user:' + #id")
                .ttl_override("${app.cache.search.ttl:300}")
                .build()?,
            user_search: CacheDirective::builder("'${app.cache.prefix:}search:' + hash(#req)")
                .ttl(5)
                .time_unit(TimeUnit::Minutes)
                .build()?,
        })
    }

    pub fn interceptor(&self) -> &Arc<CacheInterceptor<SharedStore>> {
        &self.interceptor
    }

    pub fn repository(&self) -> &Arc<UserRepository> {
        &self.repository
    }

    /// Cached as `user:info:{id}` for 30 minutes plus jitter
    pub async fn get_user_by_id(
        &self,
        ctx: &CallContext,
        id: u64,
    ) -> Result<Option<UserDto>, ServiceError> {
        let args = CallArguments::new().bind("id", &id)?;
        let repository = &self.repository;
        Ok(self
            .interceptor
            .invoke(ctx, &self.user_by_id, &args, || repository.find_by_id(id))
            .await?)
    }

    /// Cached under the configured prefix with a configurable TTL
    pub async fn get_user(
        &self,
        ctx: &CallContext,
        id: u64,
    ) -> Result<Option<UserDto>, ServiceError> {
        let args = CallArguments::new().bind("id", &id)?;
        let repository = &self.repository;
        Ok(self
            .interceptor
            .invoke(ctx, &self.user_profile, &args, || repository.find_by_id(id))
            .await?)
    }

    /// Cached by a digest of the filter; `forceRefresh` skips the read
    pub async fn search_users(
        &self,
        ctx: &CallContext,
        request: &UserSearchRequest,
    ) -> Result<Vec<UserDto>, ServiceError> {
        let args = CallArguments::new().bind_refreshable("req", request)?;
        let repository = &self.repository;
        let found = self
            .interceptor
            .invoke(ctx, &self.user_search, &args, || repository.search(request))
            .await?;
        Ok(found.unwrap_or_default())
    }

    /// Write the user, then drop every cached view of it
    pub async fn update_user(&self, user: UserDto) -> Result<(), ServiceError> {
        let id = user.id;
        let args = CallArguments::new().bind("id", &id)?;
        self.repository.upsert(user).await;

        self.interceptor.evict(&self.user_by_id, &args).await?;
        // the profile key needs `app.cache.prefix`; without it nothing was cached there
        if let Err(e) = self.interceptor.evict(&self.user_profile, &args).await {
            warn!("Profile entry for user {} not evicted: {}", id, e);
        }
        Ok(())
    }
}
