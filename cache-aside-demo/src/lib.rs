pub mod api;
pub mod inspect;
pub mod service;

pub use api::{ApiServer, ApiServerConfig};
pub use service::{DemoService, UserDto, UserRepository, UserSearchRequest};
