//! Schema paths for locating default values
//!
//! Provides [`SchemaPath`], the root-to-node sequence of schema-derived segments
//! that keys the defaults table.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde_yaml::Value;

use crate::data::{label, PlainData};
use crate::fragment::PrimitiveType;

/// One step of a schema path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Literal key declared by the schema
    Key(PlainData),
    /// Any key of a primitive type
    Typed(PrimitiveType),
    /// Any key accepted by the named predicate
    Predicate(String),
    /// Element of a sequence (all elements share one schema)
    Item,
}

impl PathSegment {
    /// Literal key segment
    #[inline]
    #[must_use]
    pub fn key(key: impl Into<PlainData>) -> Self {
        Self::Key(key.into())
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(&label(k)),
            Self::Typed(t) => write!(f, "<{t}>"),
            Self::Predicate(name) => write!(f, "<{name}>"),
            Self::Item => f.write_str("[]"),
        }
    }
}

/// Path of a node within the schema
///
/// Nodes that share a schema position share a path, whatever their live keys:
/// every element of a list sits under [`PathSegment::Item`], every key picked
/// by a typed key matcher under [`PathSegment::Typed`].
///
/// # Examples
/// - `["servers", "<string>", "port"]` → `servers.<string>.port`
/// - `["tags", "[]"]` → `tags.[]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SchemaPath(Vec<PathSegment>);

impl SchemaPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut new = self.clone();
        new.0.push(segment);
        new
    }
}

impl Display for SchemaPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for SchemaPath {
    type Err = PathError;

    /// Parse the dotted textual form
    ///
    /// Dots inside `<...>` belong to the segment, so regex predicate names
    /// survive a round trip. Plain segments always become string keys, so an
    /// integer literal key `1` reads back as `"1"`; lookups that must treat
    /// the two alike normalize the path first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let mut raw = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;
        for c in s.chars() {
            match c {
                '<' => {
                    depth += 1;
                    current.push(c);
                }
                '>' if depth > 0 => {
                    depth -= 1;
                    current.push(c);
                }
                '.' if depth == 0 => raw.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        if depth > 0 {
            return Err(PathError::UnclosedSegment(current));
        }
        raw.push(current);

        raw.into_iter()
            .map(|seg| parse_segment(&seg))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

fn parse_segment(seg: &str) -> Result<PathSegment, PathError> {
    if seg.is_empty() {
        return Err(PathError::EmptySegment);
    }
    if seg == "[]" {
        return Ok(PathSegment::Item);
    }
    if let Some(inner) = seg.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        if inner.is_empty() {
            return Err(PathError::InvalidSegment(seg.to_string()));
        }
        return Ok(match PrimitiveType::from_name(inner) {
            Some(t) => PathSegment::Typed(t),
            None => PathSegment::Predicate(inner.to_string()),
        });
    }
    Ok(PathSegment::Key(Value::String(seg.to_string())))
}

impl From<Vec<PathSegment>> for SchemaPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

/// Errors related to schema paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Malformed bracketed segment
    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    /// `<` without its closing `>`
    #[error("unclosed segment: {0}")]
    UnclosedSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_root() {
        let path = SchemaPath::root();
        assert!(path.is_empty());
        assert_eq!(path.len(), 0);
        assert!(path.parent().is_none());
    }

    #[test]
    fn path_child_and_parent() {
        let path = SchemaPath::root()
            .child(PathSegment::key("servers"))
            .child(PathSegment::Typed(PrimitiveType::String));
        assert_eq!(path.len(), 2);
        assert_eq!(path.last(), Some(&PathSegment::Typed(PrimitiveType::String)));
        assert_eq!(path.parent().unwrap().segments(), &[PathSegment::key("servers")]);
    }

    #[test]
    fn path_display() {
        let path = SchemaPath::new(vec![
            PathSegment::key("tags"),
            PathSegment::Item,
        ]);
        assert_eq!(path.to_string(), "tags.[]");
    }

    #[test]
    fn path_from_str_segments() {
        let path: SchemaPath = "servers.<str>.ports.[]".parse().unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::key("servers"),
                PathSegment::Typed(PrimitiveType::String),
                PathSegment::key("ports"),
                PathSegment::Item,
            ]
        );
    }

    #[test]
    fn path_from_str_keeps_dots_inside_predicates() {
        let path: SchemaPath = "hosts.</^[a-z]+\\.local$/>".parse().unwrap();
        assert_eq!(
            path.last(),
            Some(&PathSegment::Predicate("/^[a-z]+\\.local$/".to_string()))
        );
        assert_eq!(path.to_string().parse::<SchemaPath>().unwrap(), path);
    }

    #[test]
    fn path_from_str_empty() {
        let path: SchemaPath = "".parse().unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn path_from_str_empty_segment() {
        let result: Result<SchemaPath, _> = "a..b".parse();
        assert!(matches!(result, Err(PathError::EmptySegment)));
    }

    #[test]
    fn path_from_str_unclosed() {
        let result: Result<SchemaPath, _> = "a.<string".parse();
        assert!(matches!(result, Err(PathError::UnclosedSegment(_))));
    }
}
