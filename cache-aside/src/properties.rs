//! Config placeholder resolution
//!
//! Key templates and TTL overrides may embed `${name}` or `${name:default}`
//! placeholders. They are resolved against a [`PropertySource`] at call time,
//! so configuration-driven values can change between deployments without
//! touching the directives.

use std::collections::HashMap;
use tracing::debug;

/// Lookup of named configuration values
pub trait PropertySource: Send + Sync {
    /// Get a property by its dotted name (e.g. `app.cache.prefix`)
    fn property(&self, name: &str) -> Option<String>;
}

/// Error raised while resolving placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    /// `${name}` without default and no value for `name`
    Unresolved(String),
    /// `${` without a closing brace
    Unterminated(usize),
}

impl std::fmt::Display for PlaceholderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceholderError::Unresolved(name) => write!(f, "no value for `{}`", name),
            PlaceholderError::Unterminated(pos) => {
                write!(f, "unterminated placeholder starting at offset {}", pos)
            }
        }
    }
}

/// In-memory property map with environment fallback
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: HashMap<String, String>,
    env_fallback: bool,
}

impl Properties {
    /// Create an empty property set (no environment fallback)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a property set backed by the process environment.
    ///
    /// Loads a `.env` file first if one is present. A dotted name such as
    /// `app.cache.prefix` is looked up as `APP_CACHE_PREFIX`.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }
        Self {
            values: HashMap::new(),
            env_fallback: true,
        }
    }

    /// Set a property
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Set a property in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Environment variable name for a dotted property name
    pub fn env_key(name: &str) -> String {
        name.chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl PropertySource for Properties {
    fn property(&self, name: &str) -> Option<String> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        if self.env_fallback {
            return std::env::var(Self::env_key(name)).ok();
        }
        None
    }
}

impl<P: PropertySource + ?Sized> PropertySource for std::sync::Arc<P> {
    fn property(&self, name: &str) -> Option<String> {
        (**self).property(name)
    }
}

/// Replace every `${name}` / `${name:default}` in `text`.
///
/// Text without placeholders is returned unchanged.
pub fn resolve_placeholders(
    text: &str,
    source: &dyn PropertySource,
) -> Result<String, PlaceholderError> {
    if !text.contains("${") {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut offset = 0;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body_start = start + 2;
        let end = rest[body_start..]
            .find('}')
            .ok_or(PlaceholderError::Unterminated(offset + start))?;
        let body = &rest[body_start..body_start + end];

        let (name, default) = match body.split_once(':') {
            Some((name, default)) => (name.trim(), Some(default)),
            None => (body.trim(), None),
        };

        match source.property(name) {
            Some(value) => out.push_str(&value),
            None => match default {
                Some(default) => out.push_str(default),
                None => return Err(PlaceholderError::Unresolved(name.to_string())),
            },
        }

        let consumed = body_start + end + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}
