//! Defaults table
//!
//! Maps a schema path to the value a new child at that position starts with.
//! For a sequence node the default is one element; for a mapping node it is a
//! mapping whose entries are merged in.
//!
//! Paths are stored with integer literal keys written as text. A defaults
//! file can only spell a path as text, so `1` must find the schema key `1`.

use std::borrow::Cow;
use std::collections::HashMap;

use cfgtree_schema::{label, PathError, PathSegment, PlainData, SchemaPath};
use serde_yaml::Value;

/// Errors while reading a defaults document
#[derive(Debug, thiserror::Error)]
pub enum DefaultsError {
    #[error("defaults must be a mapping of schema paths to values")]
    NotAMapping,

    /// Path key that is not a string
    #[error("defaults key '{0}' is not a string")]
    NonStringKey(String),

    #[error("invalid schema path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },
}

/// Default values keyed by schema path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults(HashMap<SchemaPath, PlainData>);

impl Defaults {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a mapping of textual schema paths to values
    ///
    /// ```yaml
    /// servers: {web: {host: localhost, port: 80}}
    /// servers.<string>.tags: untagged
    /// ```
    ///
    /// # Errors
    /// Returns error if the document is not a mapping or a key is not a path
    pub fn from_document(document: &PlainData) -> Result<Self, DefaultsError> {
        let Value::Mapping(map) = document else {
            if document.is_null() {
                return Ok(Self::new());
            }
            return Err(DefaultsError::NotAMapping);
        };

        let mut defaults = Self::new();
        for (key, value) in map {
            let Value::String(text) = key else {
                return Err(DefaultsError::NonStringKey(label(key)));
            };
            let path = text
                .parse::<SchemaPath>()
                .map_err(|source| DefaultsError::InvalidPath {
                    path: text.clone(),
                    source,
                })?;
            defaults.insert(path, value.clone());
        }
        Ok(defaults)
    }

    /// Declare the default for `path`, replacing any earlier one
    pub fn insert(&mut self, path: SchemaPath, value: PlainData) -> Option<PlainData> {
        self.0.insert(normalize(&path).into_owned(), value)
    }

    /// Builder form of [`Self::insert`]
    #[must_use]
    pub fn with(mut self, path: SchemaPath, value: PlainData) -> Self {
        self.insert(path, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn get(&self, path: &SchemaPath) -> Option<&PlainData> {
        self.0.get(normalize(path).as_ref())
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, path: &SchemaPath) -> bool {
        self.0.contains_key(normalize(path).as_ref())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaPath, &PlainData)> {
        self.0.iter()
    }
}

impl FromIterator<(SchemaPath, PlainData)> for Defaults {
    fn from_iter<I: IntoIterator<Item = (SchemaPath, PlainData)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(path, value)| (normalize(&path).into_owned(), value))
                .collect(),
        )
    }
}

fn is_integer_key(segment: &PathSegment) -> bool {
    matches!(segment, PathSegment::Key(Value::Number(n)) if n.is_i64() || n.is_u64())
}

fn normalize(path: &SchemaPath) -> Cow<'_, SchemaPath> {
    if !path.segments().iter().any(is_integer_key) {
        return Cow::Borrowed(path);
    }
    let segments = path
        .segments()
        .iter()
        .map(|segment| match segment {
            PathSegment::Key(key) if is_integer_key(segment) => {
                PathSegment::Key(Value::String(label(key)))
            }
            other => other.clone(),
        })
        .collect::<Vec<_>>();
    Cow::Owned(SchemaPath::new(segments))
}
