//! Command-line text to plain data
//!
//! Typed input follows the current value: an integer setting reads digits as
//! an integer, a float setting reads a float, and so on. Text that does not
//! parse is passed on as a string so the node's validator can explain why it
//! is rejected.

use cfgtree_schema::{KeyMatcher, PlainData, PrimitiveType};
use serde_yaml::Value;

/// Interpret `text` as a new value for a node currently holding `current`
#[must_use]
pub fn parse_value(current: Option<&PlainData>, text: &str) -> PlainData {
    let fallback = || Value::String(text.to_string());
    match current {
        Some(Value::Number(n)) if n.is_f64() => text
            .trim()
            .parse::<f64>()
            .map_or_else(|_| fallback(), Value::from),
        Some(Value::Number(_)) => text
            .trim()
            .parse::<i64>()
            .map_or_else(|_| fallback(), Value::from),
        Some(Value::Bool(_)) => text
            .trim()
            .parse::<bool>()
            .map_or_else(|_| fallback(), Value::Bool),
        Some(Value::String(_)) => fallback(),
        _ => serde_yaml::from_str(text).unwrap_or_else(|_| fallback()),
    }
}

/// Interpret `text` as a new key for a node selected by `matcher`
#[must_use]
pub fn parse_key(matcher: Option<&KeyMatcher>, text: &str) -> PlainData {
    match matcher {
        Some(KeyMatcher::Typed(PrimitiveType::Integer)) => text
            .trim()
            .parse::<i64>()
            .map_or_else(|_| Value::from(text), Value::from),
        _ => Value::from(text),
    }
}
