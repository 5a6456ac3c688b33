//! Named call arguments

use crate::error::{CacheError, Result};
use serde::Serialize;
use serde_json::Value;

/// Capability an argument type may expose to force a per-call cache bypass
pub trait ForceRefresh {
    /// `true` skips the cache read for this call; the result is still written back
    fn skip_cache(&self) -> bool;
}

/// A single bound argument
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
    /// `Some` when the argument was bound through [`CallArguments::bind_refreshable`]
    pub force_refresh: Option<bool>,
}

/// Ordered (name, value) bindings of one invocation.
///
/// Names are declared by the caller and must be unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArguments {
    args: Vec<Argument>,
}

impl CallArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a serializable argument under `name`
    pub fn bind<T: Serialize + ?Sized>(self, name: impl Into<String>, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        self.push(name.into(), value, None)
    }

    /// Bind an argument that also carries a force-refresh signal
    pub fn bind_refreshable<T>(self, name: impl Into<String>, value: &T) -> Result<Self>
    where
        T: Serialize + ForceRefresh + ?Sized,
    {
        let signal = value.skip_cache();
        let value = serde_json::to_value(value)?;
        self.push(name.into(), value, Some(signal))
    }

    /// Bind an already structured value
    pub fn bind_value(self, name: impl Into<String>, value: Value) -> Result<Self> {
        self.push(name.into(), value, None)
    }

    fn push(mut self, name: String, value: Value, force_refresh: Option<bool>) -> Result<Self> {
        if self.get(&name).is_some() {
            return Err(CacheError::DuplicateArgument(name));
        }
        self.args.push(Argument {
            name,
            value,
            force_refresh,
        });
        Ok(self)
    }

    /// Look up an argument value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Whether any argument asks to skip the cache read
    pub fn force_refresh_requested(&self) -> bool {
        self.args.iter().any(|a| a.force_refresh == Some(true))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.args.iter()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}
