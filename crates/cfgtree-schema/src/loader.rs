//! YAML schema loader
//!
//! Reads a compact schema notation written as YAML:
//!
//! ```yaml
//! name: str
//! age: int
//! nickname?: str            # optional literal key
//! servers:
//!   <string>:               # any string key
//!     host: str
//!     ports: [int]          # sequence of integers
//! plugins:
//!   /^[a-z_]+$/: any        # keys matching the pattern
//! tags: []                  # unconstrained sequence
//! 1: str                    # integer literal key
//! ```
//!
//! Literal keys keep their YAML type, so `1` above is an integer key. Paths
//! written as text name it as `1` too; the defaults table matches the two.

use serde_yaml::Value;

use crate::data::{label, PlainData};
use crate::fragment::{KeyMatcher, KeyPredicate, MappingBuilder, PrimitiveType, SchemaFragment};

/// Errors while reading a YAML schema
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Schema text is not YAML
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// Scalar that names no known type
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// Predicate key whose pattern does not compile
    #[error("invalid key pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Sequence schema with more than one element schema
    #[error("sequence schema must have at most one element, found {0}")]
    AmbiguousSequence(usize),

    /// Node that cannot describe a schema
    #[error("unsupported schema node: {0}")]
    Unsupported(String),
}

/// Parse schema notation from a YAML string
///
/// # Errors
/// Returns error if the text is not YAML or not valid schema notation
pub fn parse_schema(text: &str) -> Result<SchemaFragment, LoadError> {
    let value: Value = serde_yaml::from_str(text)?;
    schema_from_value(&value)
}

/// Convert an already-parsed YAML value into a schema fragment
///
/// # Errors
/// Returns error if the value is not valid schema notation
pub fn schema_from_value(value: &PlainData) -> Result<SchemaFragment, LoadError> {
    match value {
        Value::Null => Ok(SchemaFragment::Any),
        Value::String(name) if name == "any" => Ok(SchemaFragment::Any),
        Value::String(name) => PrimitiveType::from_name(name)
            .map(SchemaFragment::Exact)
            .ok_or_else(|| LoadError::UnknownType(name.clone())),
        Value::Sequence(items) => match items.as_slice() {
            [] => Ok(SchemaFragment::Sequence(None)),
            [element] => Ok(SchemaFragment::sequence_of(schema_from_value(element)?)),
            _ => Err(LoadError::AmbiguousSequence(items.len())),
        },
        Value::Mapping(map) => {
            let mut builder = MappingBuilder::new();
            for (key, sub) in map {
                builder = builder.entry(key_matcher(key)?, schema_from_value(sub)?);
            }
            Ok(builder.build())
        }
        other => Err(LoadError::Unsupported(label(other))),
    }
}

fn key_matcher(key: &PlainData) -> Result<KeyMatcher, LoadError> {
    let Value::String(text) = key else {
        return Ok(KeyMatcher::Literal(key.clone()));
    };

    if let Some(inner) = text.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return PrimitiveType::from_name(inner)
            .map(KeyMatcher::Typed)
            .ok_or_else(|| LoadError::UnknownType(inner.to_string()));
    }
    if text.len() > 1 && text.starts_with('/') && text.ends_with('/') {
        let pattern = &text[1..text.len() - 1];
        return KeyPredicate::pattern(pattern)
            .map(KeyMatcher::Predicate)
            .map_err(|source| LoadError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            });
    }
    if let Some(name) = text.strip_suffix('?') {
        return Ok(KeyMatcher::optional(name));
    }
    Ok(KeyMatcher::literal(text.as_str()))
}
