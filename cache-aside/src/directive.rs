//! Cache directives attached to decorated operations

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit for TTL counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Duration of `count` units. Saturates instead of overflowing.
    pub fn to_duration(self, count: u64) -> Duration {
        match self {
            TimeUnit::Milliseconds => Duration::from_millis(count),
            TimeUnit::Seconds => Duration::from_secs(count),
            TimeUnit::Minutes => Duration::from_secs(count.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(count.saturating_mul(3600)),
            TimeUnit::Days => Duration::from_secs(count.saturating_mul(86_400)),
        }
    }
}

impl std::str::FromStr for TimeUnit {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" | "secs" | "seconds" => Ok(TimeUnit::Seconds),
            "m" | "min" | "mins" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hours" => Ok(TimeUnit::Hours),
            "d" | "days" => Ok(TimeUnit::Days),
            other => Err(CacheError::ConfigError(format!("unknown time unit `{}`", other))),
        }
    }
}

/// How an operation's results are cached.
///
/// Templates are kept unresolved; placeholders and argument references are
/// rendered per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDirective {
    key_template: String,
    base_ttl: u64,
    ttl_override_template: Option<String>,
    jitter_enabled: bool,
    time_unit: TimeUnit,
}

impl CacheDirective {
    /// Create a new builder for a directive with the given key template
    pub fn builder(key_template: impl Into<String>) -> CacheDirectiveBuilder {
        CacheDirectiveBuilder {
            key_template: key_template.into(),
            ..Default::default()
        }
    }

    pub fn key_template(&self) -> &str {
        &self.key_template
    }

    /// Base TTL as a count of [`Self::time_unit`]
    pub fn base_ttl(&self) -> u64 {
        self.base_ttl
    }

    pub fn base_ttl_duration(&self) -> Duration {
        self.time_unit.to_duration(self.base_ttl)
    }

    pub fn ttl_override_template(&self) -> Option<&str> {
        self.ttl_override_template.as_deref()
    }

    pub fn jitter_enabled(&self) -> bool {
        self.jitter_enabled
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }
}

/// Builder for [`CacheDirective`]
#[derive(Debug, Default)]
pub struct CacheDirectiveBuilder {
    key_template: String,
    base_ttl: Option<u64>,
    ttl_override_template: Option<String>,
    jitter_enabled: Option<bool>,
    time_unit: Option<TimeUnit>,
}

impl CacheDirectiveBuilder {
    /// Default base TTL, in the directive's time unit
    pub const DEFAULT_BASE_TTL: u64 = 60;

    /// Set the base TTL count
    pub fn ttl(mut self, count: u64) -> Self {
        self.base_ttl = Some(count);
        self
    }

    /// Set the unit of the base TTL and the override
    pub fn time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = Some(unit);
        self
    }

    /// Config-driven TTL, e.g. `${app.cache.search.ttl:300}`
    pub fn ttl_override(mut self, template: impl Into<String>) -> Self {
        self.ttl_override_template = Some(template.into());
        self
    }

    /// Enable or disable random TTL extension
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter_enabled = Some(enabled);
        self
    }

    /// Build and validate the directive
    pub fn build(self) -> Result<CacheDirective> {
        if self.key_template.trim().is_empty() {
            return Err(CacheError::InvalidDirective(
                "key template must not be empty".to_string(),
            ));
        }

        let base_ttl = self.base_ttl.unwrap_or(Self::DEFAULT_BASE_TTL);
        if base_ttl == 0 {
            return Err(CacheError::InvalidDirective(
                "base TTL must be greater than 0".to_string(),
            ));
        }

        if let Some(template) = &self.ttl_override_template {
            if template.trim().is_empty() {
                return Err(CacheError::InvalidDirective(
                    "TTL override must not be blank".to_string(),
                ));
            }
        }

        Ok(CacheDirective {
            key_template: self.key_template,
            base_ttl,
            ttl_override_template: self.ttl_override_template,
            jitter_enabled: self.jitter_enabled.unwrap_or(true),
            time_unit: self.time_unit.unwrap_or_default(),
        })
    }
}
