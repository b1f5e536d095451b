//! Error types for tree operations

use cfgtree_schema::{SchemaError, SchemaPath};

use crate::node::NodeId;

/// Errors returned by tree construction and edits
///
/// A failed edit leaves the tree, its document and its listeners untouched.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Value or key rejected by the node's own validator
    #[error("validation failed: {0}")]
    Validation(String),

    /// Edit would break a constraint of an enclosing schema
    #[error("schema constraint violated: {0}")]
    SchemaConstraint(String),

    /// Initial document does not match the schema
    #[error("document does not match schema: {0}")]
    InvalidDocument(#[from] SchemaError),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Key was not selected by a pattern matcher
    #[error("key of node {0} is not editable")]
    KeyNotEditable(NodeId),

    #[error("duplicate key '{0}'")]
    DuplicateKey(String),

    /// No default value declared for the node's schema path
    #[error("no default declared for '{0}'")]
    NoDefault(SchemaPath),

    /// Scalar nodes cannot have children
    #[error("node {0} cannot have children")]
    NotAContainer(NodeId),

    #[error("the root node cannot be removed")]
    RootRemoval,
}

impl TreeError {
    /// Check if the caller can report this and carry on editing
    ///
    /// Only a document rejected at load time leaves no usable tree.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidDocument(_))
    }

    /// Check if a schema rule rejected the edit (as opposed to a bad handle)
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::SchemaConstraint(_) | Self::DuplicateKey(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable() {
        assert!(TreeError::Validation("x".into()).is_recoverable());
        assert!(TreeError::RootRemoval.is_recoverable());
        let invalid = TreeError::InvalidDocument(SchemaError {
            location: "<root>".into(),
            message: "expected mapping, got string".into(),
        });
        assert!(!invalid.is_recoverable());
    }

    #[test]
    fn rejection() {
        assert!(TreeError::SchemaConstraint("x".into()).is_rejection());
        assert!(!TreeError::NodeNotFound(NodeId::new(3, 0)).is_rejection());
    }

    #[test]
    fn display() {
        let err = TreeError::NoDefault("servers.<string>".parse().unwrap());
        assert_eq!(err.to_string(), "no default declared for 'servers.<string>'");
    }
}
