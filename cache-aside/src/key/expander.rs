//! Key template rendering

use super::args::CallArguments;
use super::hash::{canonical_json, content_hash};
use super::parser::{parse, Expr, Segment};
use crate::error::KeyExpansionError;
use crate::properties::{resolve_placeholders, PlaceholderError, Properties, PropertySource};
use serde_json::Value;
use std::sync::Arc;

/// Renders key templates against call arguments
#[derive(Clone)]
pub struct KeyExpander {
    properties: Arc<dyn PropertySource>,
}

impl std::fmt::Debug for KeyExpander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyExpander").finish_non_exhaustive()
    }
}

impl Default for KeyExpander {
    fn default() -> Self {
        Self::new(Arc::new(Properties::new()))
    }
}

impl KeyExpander {
    pub fn new(properties: Arc<dyn PropertySource>) -> Self {
        Self { properties }
    }

    /// Property source used for `${...}` placeholders
    pub fn properties(&self) -> &Arc<dyn PropertySource> {
        &self.properties
    }

    /// Resolve `${...}` placeholders only
    pub fn resolve_placeholders(&self, text: &str) -> Result<String, KeyExpansionError> {
        resolve_placeholders(text, self.properties.as_ref()).map_err(|e| match e {
            PlaceholderError::Unresolved(name) => KeyExpansionError::UnresolvedPlaceholder(name),
            PlaceholderError::Unterminated(position) => KeyExpansionError::Syntax {
                position,
                message: "unterminated placeholder".to_string(),
            },
        })
    }

    /// Render `template` into a concrete key.
    ///
    /// A template with neither `#` nor `'` after placeholder resolution is a
    /// static key and is returned as is.
    pub fn expand(
        &self,
        template: &str,
        args: &CallArguments,
    ) -> Result<String, KeyExpansionError> {
        let resolved = self.resolve_placeholders(template)?;

        let key = if !resolved.contains('#') && !resolved.contains('\'') {
            resolved
        } else {
            let expr = parse(&resolved)?;
            render(&evaluate(&expr, args)?)
        };

        if key.is_empty() {
            return Err(KeyExpansionError::EmptyKey(template.to_string()));
        }
        Ok(key)
    }
}

fn evaluate(expr: &Expr, args: &CallArguments) -> Result<Value, KeyExpansionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path { root, segments } => {
            let mut current = args
                .get(root)
                .ok_or_else(|| KeyExpansionError::UnknownVariable(root.clone()))?;
            let mut path = root.clone();

            for segment in segments {
                current = match segment {
                    Segment::Field(field) => match current {
                        Value::Object(map) => map.get(field).ok_or_else(|| {
                            KeyExpansionError::UnknownVariable(format!("{}.{}", path, field))
                        })?,
                        other => {
                            return Err(KeyExpansionError::TypeMismatch(format!(
                                "cannot read field `{}` of `{}` ({})",
                                field,
                                path,
                                kind(other)
                            )))
                        }
                    },
                    Segment::Index(index) => match current {
                        Value::Array(items) => items.get(*index).ok_or_else(|| {
                            KeyExpansionError::TypeMismatch(format!(
                                "index {} out of range for `{}` (length {})",
                                index,
                                path,
                                items.len()
                            ))
                        })?,
                        other => {
                            return Err(KeyExpansionError::TypeMismatch(format!(
                                "cannot index `{}` ({})",
                                path,
                                kind(other)
                            )))
                        }
                    },
                };
                match segment {
                    Segment::Field(field) => {
                        path.push('.');
                        path.push_str(field);
                    }
                    Segment::Index(index) => path.push_str(&format!("[{}]", index)),
                }
            }

            Ok(current.clone())
        }
        Expr::Call { function, arg } => match function.as_str() {
            "hash" => Ok(Value::String(content_hash(&evaluate(arg, args)?))),
            other => Err(KeyExpansionError::UnknownFunction(other.to_string())),
        },
        Expr::Concat(terms) => {
            let mut out = String::new();
            for term in terms {
                out.push_str(&render(&evaluate(term, args)?));
            }
            Ok(Value::String(out))
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        structured => canonical_json(structured),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args() -> CallArguments {
        CallArguments::new()
            .bind("id", &1001)
            .unwrap()
            .bind_value(
                "req",
                json!({"username": "alice", "city": "shanghai", "tags": ["a", "b"]}),
            )
            .unwrap()
    }

    #[test]
    fn test_key_determinism() {
        let expander = KeyExpander::default();
        let args = CallArguments::new().bind("id", &1001).unwrap();
        for _ in 0..3 {
            assert_eq!(
                expander.expand("'user:info:' + id", &args).unwrap(),
                "user:info:1001"
            );
        }
        assert_eq!(
            expander.expand("'user:info:' + #id", &args).unwrap(),
            "user:info:1001"
        );
    }

    #[test]
    fn test_static_template_verbatim() {
        let expander = KeyExpander::default();
        assert_eq!(
            expander.expand("config:all", &CallArguments::new()).unwrap(),
            "config:all"
        );
    }

    #[test]
    fn test_placeholder_prefix() {
        let props = Properties::new().with("app.cache.prefix", "prod:v1:");
        let expander = KeyExpander::new(Arc::new(props));
        assert_eq!(
            expander
                .expand("'${app.cache.prefix}user:' + #id", &args())
                .unwrap(),
            "prod:v1:user:1001"
        );

        let bare = KeyExpander::default();
        assert_eq!(
            bare.expand("'${app.cache.prefix}user:' + #id", &args()),
            Err(KeyExpansionError::UnresolvedPlaceholder(
                "app.cache.prefix".to_string()
            ))
        );
    }

    #[test]
    fn test_paths_and_literals() {
        let expander = KeyExpander::default();
        assert_eq!(
            expander
                .expand("'search:' + #req.city + ':' + #req.tags[1]", &args())
                .unwrap(),
            "search:shanghai:b"
        );
        assert_eq!(
            expander
                .expand("'flags:' + true + ':' + null + ':' + 7", &args())
                .unwrap(),
            "flags:true:null:7"
        );
        assert_eq!(
            expander.expand("'tags:' + #req.tags", &args()).unwrap(),
            r#"tags:["a","b"]"#
        );
    }

    #[test]
    fn test_hash_function() {
        let expander = KeyExpander::default();
        let key = expander.expand("'search:' + hash(#req)", &args()).unwrap();
        assert!(key.starts_with("search:"));
        assert_eq!(key.len(), "search:".len() + 64);

        let reordered = CallArguments::new()
            .bind_value(
                "req",
                json!({"tags": ["a", "b"], "city": "shanghai", "username": "alice"}),
            )
            .unwrap();
        assert_eq!(
            expander.expand("'search:' + #hash(#req)", &reordered).unwrap(),
            key
        );

        assert_eq!(
            expander.expand("'user:' + hash(#id)", &args()).unwrap(),
            "user:1001"
        );
    }

    #[test]
    fn test_fail_closed() {
        let expander = KeyExpander::default();
        let args = args();

        assert_eq!(
            expander.expand("'user:' + #missing", &args),
            Err(KeyExpansionError::UnknownVariable("missing".to_string()))
        );
        assert_eq!(
            expander.expand("'user:' + md5(#id)", &args),
            Err(KeyExpansionError::UnknownFunction("md5".to_string()))
        );
        assert!(matches!(
            expander.expand("#id.name", &args),
            Err(KeyExpansionError::TypeMismatch(_))
        ));
        assert!(matches!(
            expander.expand("#req.tags[5]", &args),
            Err(KeyExpansionError::TypeMismatch(_))
        ));
        assert!(matches!(
            expander.expand("'user:' +", &args),
            Err(KeyExpansionError::Syntax { .. })
        ));
        assert_eq!(
            expander.expand("''", &args),
            Err(KeyExpansionError::EmptyKey("''".to_string()))
        );
        assert!(matches!(
            expander.expand("${app.prefix:}", &args),
            Err(KeyExpansionError::EmptyKey(_))
        ));
    }
}
