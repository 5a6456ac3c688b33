//! HTTP API for the cache-aside demo

pub mod middleware;
pub mod routes;
pub mod server;

pub use middleware::cache_scope;
pub use server::{ApiServer, ApiServerConfig};
