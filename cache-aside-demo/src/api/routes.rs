//! API routes for the demo server

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use cache_aside::{CacheStats, CallContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::service::{DemoService, RepositoryError, ServiceError, UserDto, UserSearchRequest};

/// Application state
pub struct AppState {
    pub service: Arc<DemoService>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Update request body
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub city: String,
}

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<UserDto>,
    pub total: usize,
}

/// Counters exposed for inspection
#[derive(Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    pub repository_queries: u64,
    pub summary: String,
}

fn status_for(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::Repository(RepositoryError::EmptyFilter) => StatusCode::BAD_REQUEST,
        other => {
            error!("Request failed: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// User by id, cached as `user:info:{id}`
pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<Arc<CallContext>>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .service
        .get_user_by_id(&ctx, id)
        .await
        .map_err(|e| status_for(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(user))
}

/// User profile, cached under the configured key prefix
pub async fn get_user_profile(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<Arc<CallContext>>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .service
        .get_user(&ctx, id)
        .await
        .map_err(|e| status_for(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(user))
}

/// Search users; `"forceRefresh": true` bypasses the cached result
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<Arc<CallContext>>,
    Json(request): Json<UserSearchRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let results = state
        .service
        .search_users(&ctx, &request)
        .await
        .map_err(|e| status_for(&e))?;

    Ok(Json(SearchResponse {
        total: results.len(),
        results,
    }))
}

/// Update a user and evict its cached entries
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if payload.name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = UserDto {
        id,
        name: payload.name,
        city: payload.city,
    };
    state
        .service
        .update_user(user.clone())
        .await
        .map_err(|e| status_for(&e))?;

    Ok(Json(user))
}

/// Interceptor counters and repository query count
pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = state.service.interceptor().stats();
    Json(StatsResponse {
        summary: cache.to_string(),
        cache,
        repository_queries: state.service.repository().queries(),
    })
}
