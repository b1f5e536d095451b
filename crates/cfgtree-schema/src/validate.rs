//! Validation grammar and per-node validators
//!
//! [`validate`] checks a whole value against a fragment. [`Validator`] and
//! [`KeyValidator`] are the gates a node runs before committing an edit.

use std::sync::Arc;

use serde_yaml::Value;

use crate::data::{describe, label, PlainData};
use crate::fragment::{KeyMatcher, SchemaFragment};
use crate::matcher::matching_entry;

/// Validation failure with the data location it occurred at
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at {location})")]
pub struct SchemaError {
    /// Dotted data path, `<root>` for the value itself
    pub location: String,
    pub message: String,
}

impl SchemaError {
    fn at(location: &[String], message: impl Into<String>) -> Self {
        let location = if location.is_empty() {
            "<root>".to_string()
        } else {
            location.join(".")
        };
        Self {
            location,
            message: message.into(),
        }
    }
}

/// Validate `value` against `schema`
///
/// Mapping rules: every data key must be accepted by some entry, every
/// [`KeyMatcher::Literal`] key must be present.
///
/// # Errors
/// Returns the first violation found, depth-first
pub fn validate(schema: &SchemaFragment, value: &PlainData) -> Result<(), SchemaError> {
    let mut location = Vec::new();
    validate_at(schema, value, &mut location)
}

fn validate_at(
    schema: &SchemaFragment,
    value: &PlainData,
    location: &mut Vec<String>,
) -> Result<(), SchemaError> {
    match schema {
        SchemaFragment::Any => Ok(()),
        SchemaFragment::Exact(t) => {
            if t.matches(value) {
                Ok(())
            } else {
                Err(SchemaError::at(
                    location,
                    format!("expected {t}, got {}", describe(value)),
                ))
            }
        }
        SchemaFragment::Sequence(element) => {
            let Value::Sequence(items) = value else {
                return Err(SchemaError::at(
                    location,
                    format!("expected sequence, got {}", describe(value)),
                ));
            };
            if let Some(element) = element {
                for (i, item) in items.iter().enumerate() {
                    location.push(i.to_string());
                    validate_at(element, item, location)?;
                    location.pop();
                }
            }
            Ok(())
        }
        SchemaFragment::Mapping(entries) => {
            let Value::Mapping(map) = value else {
                return Err(SchemaError::at(
                    location,
                    format!("expected mapping, got {}", describe(value)),
                ));
            };
            for (key, child) in map {
                let Some(entry) = matching_entry(entries, key) else {
                    return Err(SchemaError::at(
                        location,
                        format!("unexpected key '{}'", label(key)),
                    ));
                };
                location.push(label(key));
                validate_at(&entry.schema, child, location)?;
                location.pop();
            }
            for entry in entries {
                if let KeyMatcher::Literal(key) = &entry.matcher {
                    if !map.contains_key(key) {
                        return Err(SchemaError::at(
                            location,
                            format!("missing required key '{}'", label(key)),
                        ));
                    }
                }
            }
            Ok(())
        }
    }
}

/// Parse a value as a float
///
/// Floats pass through, integers widen, strings are parsed.
///
/// # Errors
/// Returns a message naming the value that could not be converted
pub fn coerce_float(value: &PlainData) -> Result<PlainData, String> {
    match value {
        Value::Number(n) if n.is_f64() => Ok(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| format!("could not convert {n} to float")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .map_err(|e| format!("could not convert string to float: '{s}' ({e})")),
        other => Err(format!("could not convert {} to float", describe(other))),
    }
}

/// Value gate built from a node's own schema
///
/// Pure and cheap to clone; nodes build one at creation time.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    schema: Option<Arc<SchemaFragment>>,
}

impl Validator {
    #[inline]
    #[must_use]
    pub fn new(schema: Option<Arc<SchemaFragment>>) -> Self {
        Self { schema }
    }

    /// Schema this validator enforces
    #[inline]
    #[must_use]
    pub fn schema(&self) -> Option<&SchemaFragment> {
        self.schema.as_deref()
    }

    /// Error message for `value`, or `None` if it is acceptable
    #[must_use]
    pub fn check(&self, value: &PlainData) -> Option<String> {
        self.coerce(value.clone()).err()
    }

    /// Value that would be stored for `value`
    ///
    /// Float schemas store the parsed float; everything else is stored as is.
    ///
    /// # Errors
    /// Returns a user-facing message if the value is not acceptable
    pub fn coerce(&self, value: PlainData) -> Result<PlainData, String> {
        let Some(schema) = self.schema.as_deref() else {
            return Ok(value);
        };
        let value = if schema.is_float() {
            coerce_float(&value).map_err(|e| format!("not valid input: {e}"))?
        } else {
            value
        };
        validate(schema, &value).map_err(|e| format!("not valid input: {e}"))?;
        Ok(value)
    }
}

/// Key gate built from the matcher that selected a node
#[derive(Debug, Clone)]
pub struct KeyValidator {
    matcher: KeyMatcher,
}

impl KeyValidator {
    #[inline]
    #[must_use]
    pub fn new(matcher: KeyMatcher) -> Self {
        Self { matcher }
    }

    #[inline]
    #[must_use]
    pub fn matcher(&self) -> &KeyMatcher {
        &self.matcher
    }

    /// Error message for `key`, or `None` if the matcher accepts it
    #[must_use]
    pub fn check(&self, key: &PlainData) -> Option<String> {
        self.matcher
            .check(key)
            .err()
            .map(|e| format!("not valid key: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::PrimitiveType;

    fn person() -> SchemaFragment {
        SchemaFragment::mapping()
            .key("name", SchemaFragment::string())
            .key("age", SchemaFragment::integer())
            .optional_key("nickname", SchemaFragment::string())
            .build()
    }

    fn yaml(s: &str) -> PlainData {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn exact_types() {
        assert!(validate(&SchemaFragment::integer(), &Value::from(4)).is_ok());
        let err = validate(&SchemaFragment::integer(), &Value::from("4")).unwrap_err();
        assert_eq!(err.location, "<root>");
        assert_eq!(err.message, "expected integer, got string");
    }

    #[test]
    fn mapping_required_and_optional_keys() {
        assert!(validate(&person(), &yaml("{name: Ann, age: 3}")).is_ok());
        assert!(validate(&person(), &yaml("{name: Ann, age: 3, nickname: A}")).is_ok());

        let err = validate(&person(), &yaml("{name: Ann}")).unwrap_err();
        assert_eq!(err.message, "missing required key 'age'");
    }

    #[test]
    fn mapping_rejects_unknown_keys() {
        let err = validate(&person(), &yaml("{name: Ann, age: 3, extra: 1}")).unwrap_err();
        assert_eq!(err.message, "unexpected key 'extra'");
    }

    #[test]
    fn nested_error_location() {
        let schema = SchemaFragment::mapping()
            .key(
                "servers",
                SchemaFragment::mapping()
                    .typed_key(
                        PrimitiveType::String,
                        SchemaFragment::sequence_of(SchemaFragment::integer()),
                    )
                    .build(),
            )
            .build();
        let err = validate(&schema, &yaml("servers: {web: [80, x]}")).unwrap_err();
        assert_eq!(err.location, "servers.web.1");
        assert!(err.to_string().contains("servers.web.1"));
    }

    #[test]
    fn typed_keys_are_optional() {
        let schema = SchemaFragment::mapping()
            .typed_key(PrimitiveType::String, SchemaFragment::integer())
            .build();
        assert!(validate(&schema, &yaml("{}")).is_ok());
    }

    #[test]
    fn float_validator_coerces_strings() {
        let v = Validator::new(Some(Arc::new(SchemaFragment::float())));
        assert_eq!(v.coerce(Value::from("61.2")).unwrap(), Value::from(61.2));
        assert_eq!(v.coerce(Value::from(60)).unwrap(), Value::from(60.0));
        assert!(v.check(&Value::from(61.2)).is_none());

        let err = v.check(&Value::from("abc")).unwrap();
        assert!(err.starts_with("not valid input"));
        assert!(err.contains("abc"));
    }

    #[test]
    fn unconstrained_validator_accepts_everything() {
        let v = Validator::default();
        assert!(v.check(&yaml("{a: [1, 2]}")).is_none());
        let any = Validator::new(Some(Arc::new(SchemaFragment::Any)));
        assert!(any.check(&Value::Null).is_none());
    }

    #[test]
    fn key_validator() {
        let v = KeyValidator::new(KeyMatcher::Typed(PrimitiveType::String));
        assert!(v.check(&Value::from("web")).is_none());
        assert!(v.check(&Value::from(3)).is_some());
    }
}
