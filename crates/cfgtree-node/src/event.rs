//! Notification channel and commit hook
//!
//! Every successful edit emits [`TreeEvent`]s to the listeners of the node it
//! happened at and of each ancestor, then hands the whole document to the
//! tree's [`CommitHook`].

use std::error::Error;

use cfgtree_schema::PlainData;

use crate::node::{NodeId, NodeKey};

/// Structural or value change in the tree
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    /// Value or key of `node` changed; `key` is its current key
    Changed { node: NodeId, key: NodeKey },
    /// `child` was appended to `parent` under `key`
    ChildAdded {
        parent: NodeId,
        child: NodeId,
        key: NodeKey,
    },
    /// Child stored under `key` was removed from `parent`
    ChildRemoved { parent: NodeId, key: NodeKey },
}

impl TreeEvent {
    /// Node the event originates at
    #[inline]
    #[must_use]
    pub fn origin(&self) -> NodeId {
        match self {
            Self::Changed { node, .. } => *node,
            Self::ChildAdded { parent, .. } | Self::ChildRemoved { parent, .. } => *parent,
        }
    }
}

/// Receiver of tree events
///
/// Called synchronously, after the tree and its document agree again.
pub trait TreeListener {
    fn on_event(&mut self, event: &TreeEvent);
}

impl<F> TreeListener for F
where
    F: FnMut(&TreeEvent),
{
    fn on_event(&mut self, event: &TreeEvent) {
        self(event);
    }
}

/// Handle returned by [`crate::SchemaTree::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) node: NodeId,
    pub(crate) listener: Box<dyn TreeListener>,
}

/// Failure reported by a commit hook
pub type CommitError = Box<dyn Error + Send + Sync>;

/// Persistence hook run after every successful edit
///
/// Receives the full document. A failure is logged and otherwise ignored: the
/// edit has already happened.
pub trait CommitHook {
    /// # Errors
    /// Returns error if the document could not be persisted
    fn on_commit(&mut self, document: &PlainData) -> Result<(), CommitError>;
}

impl<F> CommitHook for F
where
    F: FnMut(&PlainData) -> Result<(), CommitError>,
{
    fn on_commit(&mut self, document: &PlainData) -> Result<(), CommitError> {
        self(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin() {
        let changed = TreeEvent::Changed {
            node: NodeId::new(4, 0),
            key: NodeKey::Index(0),
        };
        assert_eq!(changed.origin(), NodeId::new(4, 0));

        let removed = TreeEvent::ChildRemoved {
            parent: NodeId::new(1, 0),
            key: NodeKey::Index(0),
        };
        assert_eq!(removed.origin(), NodeId::new(1, 0));
    }

    #[test]
    fn closures_are_listeners() {
        let mut seen = Vec::new();
        {
            let mut listener = |event: &TreeEvent| seen.push(event.origin());
            listener.on_event(&TreeEvent::Changed {
                node: NodeId::new(2, 0),
                key: NodeKey::Index(1),
            });
        }
        assert_eq!(seen, vec![NodeId::new(2, 0)]);
    }
}
