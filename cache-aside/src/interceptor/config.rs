//! Interceptor configuration

use crate::error::{CacheError, Result};
use crate::ttl::DEFAULT_EMPTY_MARKER_TTL;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Env var overriding [`InterceptorConfig::empty_marker_ttl`], in seconds
pub const ENV_EMPTY_MARKER_TTL_SECS: &str = "CACHE_ASIDE_EMPTY_MARKER_TTL_SECS";

/// Env var overriding [`InterceptorConfig::write_back_when_disabled`]
pub const ENV_WRITE_BACK_WHEN_DISABLED: &str = "CACHE_ASIDE_WRITE_BACK_WHEN_DISABLED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptorConfig {
    /// Lifetime of the marker written for `None` results
    pub empty_marker_ttl: Duration,

    /// Write results back even when the call context disabled cache reads
    pub write_back_when_disabled: bool,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            empty_marker_ttl: DEFAULT_EMPTY_MARKER_TTL,
            write_back_when_disabled: false,
        }
    }
}

impl InterceptorConfig {
    pub fn builder() -> InterceptorConfigBuilder {
        InterceptorConfigBuilder::default()
    }

    /// Defaults overridden by `CACHE_ASIDE_*` environment variables.
    ///
    /// Loads `.env` first if present. Malformed values are a
    /// [`CacheError::ConfigError`].
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }

        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_EMPTY_MARKER_TTL_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                CacheError::ConfigError(format!(
                    "{} must be a whole number of seconds, got `{}`",
                    ENV_EMPTY_MARKER_TTL_SECS, raw
                ))
            })?;
            config.empty_marker_ttl = Duration::from_secs(secs);
        }

        if let Ok(raw) = std::env::var(ENV_WRITE_BACK_WHEN_DISABLED) {
            config.write_back_when_disabled = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(CacheError::ConfigError(format!(
                        "{} must be a boolean, got `{}`",
                        ENV_WRITE_BACK_WHEN_DISABLED, raw
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.empty_marker_ttl.is_zero() {
            return Err(CacheError::ConfigError(
                "empty_marker_ttl must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`InterceptorConfig`]
#[derive(Debug, Default)]
pub struct InterceptorConfigBuilder {
    empty_marker_ttl: Option<Duration>,
    write_back_when_disabled: Option<bool>,
}

impl InterceptorConfigBuilder {
    pub fn empty_marker_ttl(mut self, ttl: Duration) -> Self {
        self.empty_marker_ttl = Some(ttl);
        self
    }

    pub fn write_back_when_disabled(mut self, enabled: bool) -> Self {
        self.write_back_when_disabled = Some(enabled);
        self
    }

    pub fn build(self) -> InterceptorConfig {
        let defaults = InterceptorConfig::default();

        InterceptorConfig {
            empty_marker_ttl: self.empty_marker_ttl.unwrap_or(defaults.empty_marker_ttl),
            write_back_when_disabled: self
                .write_back_when_disabled
                .unwrap_or(defaults.write_back_when_disabled),
        }
    }
}
