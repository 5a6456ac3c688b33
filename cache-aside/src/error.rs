//! Error types for cache-aside operations
//!
//! The taxonomy separates failures that must reach the caller (key expansion,
//! the wrapped operation itself) from failures that are absorbed by the
//! interceptor (store errors, TTL override parsing).

use std::time::Duration;
use thiserror::Error;

/// Crate-level error for construction-time failures
#[derive(Error, Debug)]
pub enum CacheError {
    /// Directive failed validation
    #[error("Invalid cache directive: {0}")]
    InvalidDirective(String),

    /// The same argument name was bound twice
    #[error("Duplicate call argument: {0}")]
    DuplicateArgument(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Key expansion failed
    #[error(transparent)]
    KeyExpansion(#[from] KeyExpansionError),

    /// Store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache-aside operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}

/// Failure to render a key template. Always fatal to the invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyExpansionError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unresolved placeholder `${{{0}}}`")]
    UnresolvedPlaceholder(String),

    #[error("template `{0}` rendered an empty key")]
    EmptyKey(String),
}

/// Failure talking to the backing store. Never fatal.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("store operation `{op}` timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Malformed TTL override. Recovered by falling back to the base TTL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TtlParseError {
    #[error("override `{template}` could not be resolved: {reason}")]
    Unresolved { template: String, reason: String },

    #[error("override resolved to `{0}`, which is not an integer")]
    NotInteger(String),

    #[error("override resolved to {0}, which is not a positive duration")]
    NonPositive(i64),
}

/// Error returned by an intercepted invocation.
///
/// `Operation` carries the wrapped operation's own error unchanged.
#[derive(Error, Debug)]
pub enum InvokeError<E> {
    #[error("cache key expansion failed: {0}")]
    Key(#[from] KeyExpansionError),

    #[error("{0}")]
    Operation(E),
}

impl<E> InvokeError<E> {
    /// Whether the failure came from key expansion rather than the operation
    pub fn is_key_error(&self) -> bool {
        matches!(self, InvokeError::Key(_))
    }

    /// The wrapped operation's error, if that is what failed
    pub fn into_operation(self) -> Option<E> {
        match self {
            InvokeError::Operation(e) => Some(e),
            InvokeError::Key(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::InvalidDirective("key template must not be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid cache directive: key template must not be empty"
        );

        let timeout = StoreError::Timeout {
            op: "get",
            after: Duration::from_millis(250),
        };
        assert!(timeout.to_string().contains("`get` timed out"));

        let placeholder = KeyExpansionError::UnresolvedPlaceholder("app.cache.prefix".to_string());
        assert_eq!(
            placeholder.to_string(),
            "unresolved placeholder `${app.cache.prefix}`"
        );
    }

    #[test]
    fn test_error_conversion() {
        let error: CacheError = "test error".into();
        assert!(matches!(error, CacheError::Other(_)));

        let error: CacheError = KeyExpansionError::UnknownVariable("id".to_string()).into();
        assert!(matches!(error, CacheError::KeyExpansion(_)));
    }

    #[test]
    fn test_invoke_error_split() {
        let key: InvokeError<std::io::Error> =
            KeyExpansionError::UnknownVariable("id".to_string()).into();
        assert!(key.is_key_error());
        assert!(key.into_operation().is_none());

        let op: InvokeError<String> = InvokeError::Operation("db down".to_string());
        assert_eq!(op.to_string(), "db down");
        assert_eq!(op.into_operation(), Some("db down".to_string()));
    }
}
