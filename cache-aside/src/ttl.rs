//! Effective expiry computation

use crate::directive::CacheDirective;
use crate::error::TtlParseError;
use crate::properties::{resolve_placeholders, Properties, PropertySource};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Upper bound of the random extension, as a divisor of the resolved TTL
const JITTER_DIVISOR: u128 = 5;

/// Longest lifetime ever handed to a store; larger TTLs are clamped
pub const MAX_TTL: Duration = Duration::from_secs(365 * 86_400);

/// Default lifetime of an empty marker
pub const DEFAULT_EMPTY_MARKER_TTL: Duration = Duration::from_secs(60);

/// Computes how long a written entry lives
#[derive(Clone)]
pub struct TtlPolicy {
    properties: Arc<dyn PropertySource>,
    empty_marker_ttl: Duration,
}

impl std::fmt::Debug for TtlPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlPolicy")
            .field("empty_marker_ttl", &self.empty_marker_ttl)
            .finish_non_exhaustive()
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(Arc::new(Properties::new()), DEFAULT_EMPTY_MARKER_TTL)
    }
}

impl TtlPolicy {
    pub fn new(properties: Arc<dyn PropertySource>, empty_marker_ttl: Duration) -> Self {
        Self {
            properties,
            empty_marker_ttl,
        }
    }

    /// Fixed TTL for empty markers
    pub fn empty_marker_ttl(&self) -> Duration {
        self.empty_marker_ttl
    }

    /// Effective TTL for one write, jitter included
    pub fn resolve(&self, directive: &CacheDirective) -> Duration {
        let mut ttl = self.resolve_base(directive);
        if ttl > MAX_TTL {
            warn!(
                "TTL {:?} for key `{}` exceeds {:?}, clamping",
                ttl,
                directive.key_template(),
                MAX_TTL
            );
            ttl = MAX_TTL;
        }

        if directive.jitter_enabled() {
            ttl.saturating_add(jitter(ttl))
        } else {
            ttl
        }
    }

    /// TTL before jitter: the override if it parses to a positive count,
    /// otherwise the directive's base TTL
    pub fn resolve_base(&self, directive: &CacheDirective) -> Duration {
        let Some(template) = directive.ttl_override_template() else {
            return directive.base_ttl_duration();
        };

        match self.parse_override(template) {
            Ok(count) => directive.time_unit().to_duration(count),
            Err(e) => {
                warn!(
                    "Falling back to base TTL {} {:?} for key `{}`: {}",
                    directive.base_ttl(),
                    directive.time_unit(),
                    directive.key_template(),
                    e
                );
                directive.base_ttl_duration()
            }
        }
    }

    /// Parse an override template into a positive unit count
    pub fn parse_override(&self, template: &str) -> Result<u64, TtlParseError> {
        let resolved = resolve_placeholders(template, self.properties.as_ref()).map_err(|e| {
            TtlParseError::Unresolved {
                template: template.to_string(),
                reason: e.to_string(),
            }
        })?;

        let trimmed = resolved.trim();
        let count: i64 = trimmed
            .parse()
            .map_err(|_| TtlParseError::NotInteger(trimmed.to_string()))?;

        if count <= 0 {
            return Err(TtlParseError::NonPositive(count));
        }
        Ok(count as u64)
    }
}

/// Uniform extension in `[0, ttl / 5)` at millisecond resolution
fn jitter(ttl: Duration) -> Duration {
    let max_ms = ttl.as_millis() / JITTER_DIVISOR;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let max_ms = u64::try_from(max_ms).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}
