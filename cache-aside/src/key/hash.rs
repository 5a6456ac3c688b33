//! Content hashing for structured key arguments

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Render a value as JSON with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(&Canonical(value)).unwrap_or_else(|_| value.to_string())
}

struct Canonical<'a>(&'a Value);

impl serde::Serialize for Canonical<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{SerializeMap, SerializeSeq};

        match self.0 {
            Value::Object(map) => {
                let sorted: BTreeMap<&String, &Value> = map.iter().collect();
                let mut out = serializer.serialize_map(Some(sorted.len()))?;
                for (k, v) in sorted {
                    out.serialize_entry(k, &Canonical(v))?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&Canonical(item))?;
                }
                out.end()
            }
            other => serde::Serialize::serialize(other, serializer),
        }
    }
}

/// Stable hash of an argument value.
///
/// Text, numbers and booleans hash to their own string form; `null` to
/// `"null"`. Objects and arrays hash to the SHA-256 hex digest of their
/// canonical JSON, so field insertion order does not matter.
pub fn content_hash(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        structured => {
            let mut hasher = Sha256::new();
            hasher.update(canonical_json(structured).as_bytes());
            hex::encode(hasher.finalize())
        }
    }
}
