//! Schema grammar
//!
//! A [`SchemaFragment`] describes the permitted shape of one piece of a
//! settings document. Fragments are supplied by the caller, either built in
//! code through [`MappingBuilder`] or loaded from YAML (see [`crate::loader`]).

use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use serde_yaml::Value;

use crate::data::PlainData;

/// Primitive scalar types the grammar can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Integer,
    Float,
    Boolean,
}

impl PrimitiveType {
    /// Check whether `value` is an instance of this type
    ///
    /// Integers are not floats and booleans are not integers.
    #[inline]
    #[must_use]
    pub fn matches(self, value: &PlainData) -> bool {
        match (self, value) {
            (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Float, Value::Number(n)) => n.is_f64(),
            (Self::Boolean, Value::Bool(_)) => true,
            _ => false,
        }
    }

    /// Canonical lowercase name
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }

    /// Parse a type name, accepting the short aliases `str`, `int` and `bool`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" | "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type PredicateFn = dyn Fn(&PlainData) -> Result<(), String> + Send + Sync;

/// Named predicate over map keys
///
/// A key matches when the predicate returns `Ok(())`. The name identifies the
/// predicate in schema paths and is the basis for equality.
#[derive(Clone)]
pub struct KeyPredicate {
    name: String,
    check: Arc<PredicateFn>,
}

impl KeyPredicate {
    /// Wrap a closure as a key predicate
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&PlainData) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Predicate accepting string keys that match a regular expression
    ///
    /// The predicate is named `/pattern/`.
    ///
    /// # Errors
    /// Returns error if the pattern does not compile
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let re = regex::Regex::new(pattern)?;
        let name = format!("/{pattern}/");
        Ok(Self::new(name, move |key| match key {
            Value::String(s) if re.is_match(s) => Ok(()),
            Value::String(s) => Err(format!("'{s}' does not match {}", re.as_str())),
            other => Err(format!(
                "expected a string key, got {}",
                crate::data::describe(other)
            )),
        }))
    }

    /// Predicate name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the predicate
    ///
    /// # Errors
    /// Returns the predicate's rejection message
    #[inline]
    pub fn check(&self, key: &PlainData) -> Result<(), String> {
        (self.check)(key)
    }

    /// Check whether the predicate accepts `key`
    #[inline]
    #[must_use]
    pub fn accepts(&self, key: &PlainData) -> bool {
        self.check(key).is_ok()
    }
}

impl Debug for KeyPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyPredicate").field(&self.name).finish()
    }
}

impl PartialEq for KeyPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// How a mapping entry selects the data keys it governs
#[derive(Debug, Clone, PartialEq)]
pub enum KeyMatcher {
    /// Exactly this key; required
    Literal(PlainData),
    /// Exactly this key; may be absent
    Optional(PlainData),
    /// Any key that is an instance of the type; may be absent
    Typed(PrimitiveType),
    /// Any key accepted by the predicate; may be absent
    Predicate(KeyPredicate),
}

impl KeyMatcher {
    /// Required literal key
    #[inline]
    #[must_use]
    pub fn literal(key: impl Into<PlainData>) -> Self {
        Self::Literal(key.into())
    }

    /// Optional literal key
    #[inline]
    #[must_use]
    pub fn optional(key: impl Into<PlainData>) -> Self {
        Self::Optional(key.into())
    }

    /// The literal key, if this is a literal or optional matcher
    #[inline]
    #[must_use]
    pub fn literal_key(&self) -> Option<&PlainData> {
        match self {
            Self::Literal(k) | Self::Optional(k) => Some(k),
            Self::Typed(_) | Self::Predicate(_) => None,
        }
    }

    /// Whether data must contain this key
    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Whether the matcher selects keys by pattern rather than by name
    #[inline]
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Typed(_) | Self::Predicate(_))
    }

    /// Check `key` against this matcher
    ///
    /// # Errors
    /// Returns a message describing why the key is rejected
    pub fn check(&self, key: &PlainData) -> Result<(), String> {
        match self {
            Self::Literal(k) | Self::Optional(k) if k == key => Ok(()),
            Self::Literal(k) | Self::Optional(k) => Err(format!(
                "expected key '{}', got '{}'",
                crate::data::label(k),
                crate::data::label(key)
            )),
            Self::Typed(t) if t.matches(key) => Ok(()),
            Self::Typed(t) => Err(format!(
                "expected a {t} key, got {}",
                crate::data::describe(key)
            )),
            Self::Predicate(p) => p.check(key),
        }
    }

    /// Check whether `key` is accepted
    #[inline]
    #[must_use]
    pub fn accepts(&self, key: &PlainData) -> bool {
        self.check(key).is_ok()
    }
}

/// One `(key matcher, sub-schema)` pair of a mapping schema
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    pub matcher: KeyMatcher,
    pub schema: Arc<SchemaFragment>,
}

/// Recursive schema grammar
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaFragment {
    /// Instance of a primitive type
    Exact(PrimitiveType),
    /// Mapping; entry order decides matching precedence among pattern keys
    Mapping(Vec<MappingEntry>),
    /// Sequence whose elements all follow one schema (unconstrained if `None`)
    Sequence(Option<Arc<SchemaFragment>>),
    /// No constraint
    Any,
}

impl SchemaFragment {
    #[inline]
    #[must_use]
    pub fn string() -> Self {
        Self::Exact(PrimitiveType::String)
    }

    #[inline]
    #[must_use]
    pub fn integer() -> Self {
        Self::Exact(PrimitiveType::Integer)
    }

    #[inline]
    #[must_use]
    pub fn float() -> Self {
        Self::Exact(PrimitiveType::Float)
    }

    #[inline]
    #[must_use]
    pub fn boolean() -> Self {
        Self::Exact(PrimitiveType::Boolean)
    }

    /// Sequence of elements following `element`
    #[inline]
    #[must_use]
    pub fn sequence_of(element: SchemaFragment) -> Self {
        Self::Sequence(Some(Arc::new(element)))
    }

    /// Start building a mapping schema
    #[inline]
    #[must_use]
    pub fn mapping() -> MappingBuilder {
        MappingBuilder::new()
    }

    /// Whether this is the float scalar schema (the only coerced one)
    #[inline]
    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Exact(PrimitiveType::Float))
    }

    /// Mapping entries, if this is a mapping schema
    #[inline]
    #[must_use]
    pub fn entries(&self) -> Option<&[MappingEntry]> {
        match self {
            Self::Mapping(entries) => Some(entries),
            _ => None,
        }
    }
}

/// Builder for mapping schemas
///
/// Entries keep the order they are added in.
#[derive(Debug, Default)]
pub struct MappingBuilder {
    entries: Vec<MappingEntry>,
}

impl MappingBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry with an explicit matcher
    #[inline]
    #[must_use]
    pub fn entry(mut self, matcher: KeyMatcher, schema: SchemaFragment) -> Self {
        self.entries.push(MappingEntry {
            matcher,
            schema: Arc::new(schema),
        });
        self
    }

    /// Required literal key
    #[inline]
    #[must_use]
    pub fn key(self, key: impl Into<PlainData>, schema: SchemaFragment) -> Self {
        self.entry(KeyMatcher::literal(key), schema)
    }

    /// Optional literal key
    #[inline]
    #[must_use]
    pub fn optional_key(self, key: impl Into<PlainData>, schema: SchemaFragment) -> Self {
        self.entry(KeyMatcher::optional(key), schema)
    }

    /// Any key of the given type
    #[inline]
    #[must_use]
    pub fn typed_key(self, key_type: PrimitiveType, schema: SchemaFragment) -> Self {
        self.entry(KeyMatcher::Typed(key_type), schema)
    }

    /// Any key accepted by the predicate
    #[inline]
    #[must_use]
    pub fn predicate_key(self, predicate: KeyPredicate, schema: SchemaFragment) -> Self {
        self.entry(KeyMatcher::Predicate(predicate), schema)
    }

    /// Finish the mapping schema
    #[inline]
    #[must_use]
    pub fn build(self) -> SchemaFragment {
        SchemaFragment::Mapping(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_matches_are_strict() {
        assert!(PrimitiveType::Integer.matches(&Value::from(3)));
        assert!(!PrimitiveType::Integer.matches(&Value::from(3.0)));
        assert!(!PrimitiveType::Float.matches(&Value::from(3)));
        assert!(!PrimitiveType::Integer.matches(&Value::Bool(true)));
        assert!(PrimitiveType::String.matches(&Value::from("x")));
    }

    #[test]
    fn primitive_from_name_aliases() {
        assert_eq!(PrimitiveType::from_name("str"), Some(PrimitiveType::String));
        assert_eq!(PrimitiveType::from_name("integer"), Some(PrimitiveType::Integer));
        assert_eq!(PrimitiveType::from_name("decimal"), None);
    }

    #[test]
    fn pattern_predicate() {
        let p = KeyPredicate::pattern("^[a-z_]+$").unwrap();
        assert_eq!(p.name(), "/^[a-z_]+$/");
        assert!(p.accepts(&Value::from("db_main")));
        assert!(!p.accepts(&Value::from("Main")));
        assert!(!p.accepts(&Value::from(1)));
    }

    #[test]
    fn matcher_check_messages() {
        let typed = KeyMatcher::Typed(PrimitiveType::String);
        assert!(typed.accepts(&Value::from("a")));
        let err = typed.check(&Value::from(1)).unwrap_err();
        assert!(err.contains("string key"));

        let literal = KeyMatcher::literal("name");
        assert!(literal.is_required());
        assert!(!KeyMatcher::optional("name").is_required());
        assert!(literal.check(&Value::from("other")).is_err());
    }

    #[test]
    fn builder_keeps_entry_order() {
        let schema = SchemaFragment::mapping()
            .key("name", SchemaFragment::string())
            .typed_key(PrimitiveType::String, SchemaFragment::integer())
            .build();

        let entries = schema.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].matcher, KeyMatcher::literal("name"));
        assert_eq!(entries[1].matcher, KeyMatcher::Typed(PrimitiveType::String));
    }
}
