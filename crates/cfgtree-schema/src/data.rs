//! Plain data model
//!
//! Documents are handled as already-parsed [`serde_yaml::Value`] trees. Mappings
//! keep insertion order and accept non-string keys, which typed keys need.

use serde_yaml::Value;

/// A parsed settings document, or any fragment of one
pub type PlainData = Value;

/// Short type label used in error messages
#[must_use]
pub fn describe(value: &PlainData) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Render a key or scalar for display
///
/// Strings are shown without quotes; containers fall back to a flow-style
/// YAML rendering.
#[must_use]
pub fn label(value: &PlainData) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| describe(other).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_distinguishes_numbers() {
        assert_eq!(describe(&Value::from(3)), "integer");
        assert_eq!(describe(&Value::from(3.5)), "float");
        assert_eq!(describe(&Value::from("x")), "string");
    }

    #[test]
    fn label_strips_quotes() {
        assert_eq!(label(&Value::from("host")), "host");
        assert_eq!(label(&Value::from(8080)), "8080");
        assert_eq!(label(&Value::Bool(true)), "true");
    }
}
