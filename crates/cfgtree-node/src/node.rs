//! Node identity and read access
//!
//! Nodes live in an arena owned by [`crate::SchemaTree`]. A [`NodeId`] is the
//! stable handle renderers hold; [`NodeRef`] is a borrowed read view.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use cfgtree_schema::{
    label, KeyMatcher, KeyValidator, PlainData, SchemaFragment, SchemaPath, Validator,
};
use serde_yaml::Value;

use crate::tree::SchemaTree;

/// Arena handle of a node
///
/// Slots freed by removals are reused, but each reuse bumps the slot's
/// generation, so a handle to a removed node stays dangling instead of
/// silently pointing at a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl NodeId {
    #[inline]
    pub(crate) const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Raw arena index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }

    /// How many times the slot was reused before this node took it
    #[inline]
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

/// Key of a node within its parent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// Identifier of the tree root
    Root(String),
    /// Mapping key
    Key(PlainData),
    /// Sequence position
    Index(usize),
}

impl NodeKey {
    /// Key as it appears in the parent's document
    #[must_use]
    pub fn as_data(&self) -> PlainData {
        match self {
            Self::Root(name) => Value::String(name.clone()),
            Self::Key(key) => key.clone(),
            Self::Index(i) => Value::from(*i),
        }
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(name) => f.write_str(name),
            Self::Key(key) => f.write_str(&label(key)),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Shape of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Map,
    Sequence,
    Scalar,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Map => "map",
            Self::Sequence => "sequence",
            Self::Scalar => "scalar",
        })
    }
}

/// Node payload: ordered children for containers, the raw value for leaves
#[derive(Debug, Clone)]
pub(crate) enum Content {
    Map(Vec<NodeId>),
    Sequence(Vec<NodeId>),
    Scalar(PlainData),
}

impl Content {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Self::Map(_) => NodeKind::Map,
            Self::Sequence(_) => NodeKind::Sequence,
            Self::Scalar(_) => NodeKind::Scalar,
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match self {
            Self::Map(children) | Self::Sequence(children) => children,
            Self::Scalar(_) => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Self::Map(children) | Self::Sequence(children) => Some(children),
            Self::Scalar(_) => None,
        }
    }
}

/// Arena slot
#[derive(Debug)]
pub(crate) struct NodeSlot {
    pub(crate) key: NodeKey,
    pub(crate) parent: Option<NodeId>,
    pub(crate) content: Content,
    pub(crate) schema: Option<Arc<SchemaFragment>>,
    pub(crate) key_matcher: Option<KeyMatcher>,
    pub(crate) path: SchemaPath,
    pub(crate) validator: Validator,
    pub(crate) key_validator: Option<KeyValidator>,
}

/// Borrowed view of one node
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a SchemaTree,
    id: NodeId,
    slot: &'a NodeSlot,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(tree: &'a SchemaTree, id: NodeId, slot: &'a NodeSlot) -> Self {
        Self { tree, id, slot }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &'a NodeKey {
        &self.slot.key
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.slot.content.kind()
    }

    /// Current value, materialized from the subtree
    #[must_use]
    pub fn value(&self) -> PlainData {
        self.tree.materialize(self.slot)
    }

    /// Raw value of a scalar node without materializing
    #[inline]
    #[must_use]
    pub fn scalar(&self) -> Option<&'a PlainData> {
        match &self.slot.content {
            Content::Scalar(value) => Some(value),
            Content::Map(_) | Content::Sequence(_) => None,
        }
    }

    /// Schema governing this node (`None` = unconstrained)
    #[inline]
    #[must_use]
    pub fn schema(&self) -> Option<&'a SchemaFragment> {
        self.slot.schema.as_deref()
    }

    /// Matcher that selected this node; present only when the key is editable
    #[inline]
    #[must_use]
    pub fn key_matcher(&self) -> Option<&'a KeyMatcher> {
        self.slot.key_matcher.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_key_editable(&self) -> bool {
        self.slot.key_validator.is_some()
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &'a SchemaPath {
        &self.slot.path
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.slot.parent
    }

    /// Children in document order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &'a [NodeId] {
        self.slot.content.children()
    }

    /// Message a renderer shows for `value`, or `None` if it would be accepted
    #[must_use]
    pub fn check_value(&self, value: &PlainData) -> Option<String> {
        self.slot.validator.check(value)
    }

    /// Message a renderer shows for `key`, or `None` if it would be accepted
    ///
    /// Always rejects when the key is not editable.
    #[must_use]
    pub fn check_key(&self, key: &PlainData) -> Option<String> {
        match &self.slot.key_validator {
            Some(validator) => validator.check(key),
            None => Some(format!("key '{}' is not editable", self.slot.key)),
        }
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("key", &self.slot.key)
            .field("kind", &self.kind())
            .field("path", &self.slot.path.to_string())
            .finish()
    }
}
