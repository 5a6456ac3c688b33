//! Offline helpers behind the `expand` and `ttl` commands

use anyhow::{anyhow, Context, Result};
use cache_aside::{CacheDirective, CallArguments, KeyExpander, Properties, TimeUnit, TtlPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Parse `name=value`. The value is read as JSON when it parses, as a plain
/// string otherwise, so `id=1001` binds a number and `city=shanghai` a string.
pub fn parse_binding(raw: &str) -> Result<(String, serde_json::Value)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got `{}`", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("argument name must not be empty in `{}`", raw));
    }

    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

/// Parse `key=value` into a property
pub fn parse_property(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got `{}`", raw))?;
    Ok((key.trim().to_string(), value.to_string()))
}

/// Properties from the environment overlaid with `key=value` pairs
pub fn properties(pairs: &[String]) -> Result<Properties> {
    let mut props = Properties::from_env();
    for raw in pairs {
        let (key, value) = parse_property(raw)?;
        props.insert(key, value);
    }
    Ok(props)
}

/// Render a key template the way the interceptor would
pub fn expand_key(template: &str, bindings: &[String], props: Properties) -> Result<String> {
    let mut args = CallArguments::new();
    for raw in bindings {
        let (name, value) = parse_binding(raw)?;
        args = args.bind_value(name, value)?;
    }

    let expander = KeyExpander::new(Arc::new(props));
    expander
        .expand(template, &args)
        .with_context(|| format!("failed to expand `{}`", template))
}

/// Sample effective TTLs for a directive
pub fn sample_ttls(
    base: u64,
    unit: TimeUnit,
    override_template: Option<&str>,
    jitter: bool,
    samples: usize,
    props: Properties,
) -> Result<Vec<Duration>> {
    let mut builder = CacheDirective::builder("ttl-sample").ttl(base).time_unit(unit).jitter(jitter);
    if let Some(template) = override_template {
        builder = builder.ttl_override(template);
    }
    let directive = builder.build()?;

    let policy = TtlPolicy::new(Arc::new(props), cache_aside::ttl::DEFAULT_EMPTY_MARKER_TTL);
    Ok((0..samples.max(1)).map(|_| policy.resolve(&directive)).collect())
}
