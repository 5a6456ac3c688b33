//! Call-scope middleware for Axum

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use cache_aside::{CacheControl, ControlTarget};
use std::sync::Arc;

/// Cache control declared on the whole demo controller; `None` means the
/// library default applies to routes without their own control
pub const CONTROLLER_CONTROL: Option<CacheControl> = None;

/// Target for a route declaring `method`, inside the demo controller
pub fn route_target(method: Option<CacheControl>) -> ControlTarget {
    ControlTarget {
        method,
        owner: CONTROLLER_CONTROL,
    }
}

/// Opens a call scope for the request.
///
/// The context is stored in the request extensions for handlers to pick up
/// and cleared when the response has been produced, the handler failed or
/// the connection was dropped.
pub async fn cache_scope(
    State(target): State<ControlTarget>,
    mut request: Request,
    next: Next,
) -> Response {
    let guard = target.enter();
    request
        .extensions_mut()
        .insert(Arc::clone(guard.context()));

    next.run(request).await
}

