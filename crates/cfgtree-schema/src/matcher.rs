//! Child schema resolution
//!
//! Decides which sub-schema of a parent fragment governs a given child key.
//! Precedence inside a mapping: literal keys, then typed and predicate keys in
//! declared order, then a string- or integer-typed wildcard entry.

use std::sync::Arc;

use crate::data::PlainData;
use crate::fragment::{KeyMatcher, MappingEntry, PrimitiveType, SchemaFragment};
use crate::path::PathSegment;

/// Outcome of resolving a child key against its parent's schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildSchema {
    /// Pattern matcher that selected the child, making its key editable
    pub key_matcher: Option<KeyMatcher>,
    /// Schema governing the child's value (`None` = unconstrained)
    pub schema: Option<Arc<SchemaFragment>>,
    /// Schema path segment for the child, when the schema names one
    pub segment: Option<PathSegment>,
}

impl ChildSchema {
    /// No constraint propagates to the child
    #[inline]
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::default()
    }
}

/// Resolve the schema for child `key` of a value governed by `parent`
#[must_use]
pub fn resolve_child_schema(parent: Option<&SchemaFragment>, key: &PlainData) -> ChildSchema {
    match parent {
        None | Some(SchemaFragment::Any | SchemaFragment::Exact(_)) => ChildSchema::unconstrained(),
        Some(SchemaFragment::Sequence(element)) => ChildSchema {
            key_matcher: None,
            schema: element.clone(),
            segment: Some(PathSegment::Item),
        },
        Some(SchemaFragment::Mapping(entries)) => resolve_in_mapping(entries, key),
    }
}

fn resolve_in_mapping(entries: &[MappingEntry], key: &PlainData) -> ChildSchema {
    if let Some(entry) = matching_entry(entries, key) {
        return match &entry.matcher {
            KeyMatcher::Literal(k) | KeyMatcher::Optional(k) => ChildSchema {
                key_matcher: None,
                schema: Some(Arc::clone(&entry.schema)),
                segment: Some(PathSegment::Key(k.clone())),
            },
            matcher @ (KeyMatcher::Typed(_) | KeyMatcher::Predicate(_)) => ChildSchema {
                key_matcher: Some(matcher.clone()),
                schema: Some(Arc::clone(&entry.schema)),
                segment: Some(pattern_segment(matcher)),
            },
        };
    }

    // Wildcard fallback: a key of the "wrong" type still inherits the
    // string- or integer-keyed schema, but its key stays read-only.
    for wildcard in [PrimitiveType::String, PrimitiveType::Integer] {
        let fallback = entries
            .iter()
            .find(|e| matches!(e.matcher, KeyMatcher::Typed(t) if t == wildcard));
        if let Some(entry) = fallback {
            return ChildSchema {
                key_matcher: None,
                schema: Some(Arc::clone(&entry.schema)),
                segment: Some(PathSegment::Typed(wildcard)),
            };
        }
    }

    ChildSchema::unconstrained()
}

/// Find the entry that governs `key`, without the wildcard fallback
///
/// This is the matching rule the validation grammar uses: a key no entry
/// accepts is not allowed in the mapping.
#[must_use]
pub fn matching_entry<'a>(entries: &'a [MappingEntry], key: &PlainData) -> Option<&'a MappingEntry> {
    entries
        .iter()
        .find(|e| e.matcher.literal_key() == Some(key))
        .or_else(|| {
            entries
                .iter()
                .find(|e| e.matcher.is_pattern() && e.matcher.accepts(key))
        })
}

fn pattern_segment(matcher: &KeyMatcher) -> PathSegment {
    match matcher {
        KeyMatcher::Typed(t) => PathSegment::Typed(*t),
        KeyMatcher::Predicate(p) => PathSegment::Predicate(p.name().to_string()),
        KeyMatcher::Literal(k) | KeyMatcher::Optional(k) => PathSegment::Key(k.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::KeyPredicate;
    use serde_yaml::Value;

    fn servers_schema() -> SchemaFragment {
        SchemaFragment::mapping()
            .key("default", SchemaFragment::string())
            .predicate_key(
                KeyPredicate::pattern("^db_").unwrap(),
                SchemaFragment::boolean(),
            )
            .typed_key(PrimitiveType::String, SchemaFragment::integer())
            .build()
    }

    #[test]
    fn absent_or_any_parent_is_unconstrained() {
        let key = Value::from("x");
        assert_eq!(resolve_child_schema(None, &key), ChildSchema::unconstrained());
        assert_eq!(
            resolve_child_schema(Some(&SchemaFragment::Any), &key),
            ChildSchema::unconstrained()
        );
    }

    #[test]
    fn literal_key_wins_over_typed() {
        let schema = servers_schema();
        let child = resolve_child_schema(Some(&schema), &Value::from("default"));
        assert_eq!(child.key_matcher, None);
        assert_eq!(child.schema.as_deref(), Some(&SchemaFragment::string()));
        assert_eq!(child.segment, Some(PathSegment::key("default")));
    }

    #[test]
    fn pattern_keys_in_declared_order() {
        let schema = servers_schema();

        let db = resolve_child_schema(Some(&schema), &Value::from("db_main"));
        assert!(matches!(db.key_matcher, Some(KeyMatcher::Predicate(_))));
        assert_eq!(db.schema.as_deref(), Some(&SchemaFragment::boolean()));
        assert_eq!(db.segment, Some(PathSegment::Predicate("/^db_/".to_string())));

        let web = resolve_child_schema(Some(&schema), &Value::from("web"));
        assert_eq!(web.key_matcher, Some(KeyMatcher::Typed(PrimitiveType::String)));
        assert_eq!(web.schema.as_deref(), Some(&SchemaFragment::integer()));
        assert_eq!(web.segment, Some(PathSegment::Typed(PrimitiveType::String)));
    }

    #[test]
    fn wildcard_fallback_keeps_key_read_only() {
        let schema = servers_schema();
        let child = resolve_child_schema(Some(&schema), &Value::from(7));
        assert_eq!(child.key_matcher, None);
        assert_eq!(child.schema.as_deref(), Some(&SchemaFragment::integer()));
    }

    #[test]
    fn unmatched_key_without_wildcard() {
        let schema = SchemaFragment::mapping()
            .key("name", SchemaFragment::string())
            .build();
        let child = resolve_child_schema(Some(&schema), &Value::from("other"));
        assert_eq!(child, ChildSchema::unconstrained());
    }

    #[test]
    fn sequence_children_share_element_schema() {
        let schema = SchemaFragment::sequence_of(SchemaFragment::string());
        for index in [0, 5] {
            let child = resolve_child_schema(Some(&schema), &Value::from(index));
            assert_eq!(child.schema.as_deref(), Some(&SchemaFragment::string()));
            assert_eq!(child.segment, Some(PathSegment::Item));
            assert_eq!(child.key_matcher, None);
        }
    }

    #[test]
    fn identical_sub_schemas_keep_their_own_segments() {
        let schema = SchemaFragment::mapping()
            .key("width", SchemaFragment::integer())
            .key("height", SchemaFragment::integer())
            .build();
        let height = resolve_child_schema(Some(&schema), &Value::from("height"));
        assert_eq!(height.segment, Some(PathSegment::key("height")));
    }
}
