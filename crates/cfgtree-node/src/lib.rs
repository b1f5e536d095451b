//! cfgtree node layer
//!
//! A mutable tree of nodes over a settings document, kept valid against its
//! schema at every step.
//!
//! # Core Concepts
//!
//! - [`SchemaTree`]: the data source; owns nodes, defaults, listeners and the
//!   commit hook
//! - [`NodeId`] / [`NodeRef`]: stable handle and read view of one node
//! - [`TreeEvent`] / [`TreeListener`]: notifications after each edit
//! - [`CommitHook`]: persistence callback run after each edit
//! - [`Defaults`]: values new children start from, keyed by schema path
//!
//! # Example
//!
//! ```rust
//! use cfgtree_node::{Defaults, SchemaTree};
//! use cfgtree_schema::SchemaFragment;
//!
//! let schema = SchemaFragment::mapping()
//!     .key("name", SchemaFragment::string())
//!     .key("weight", SchemaFragment::float())
//!     .build();
//! let data = serde_yaml::from_str("{name: Ann, weight: 60.0}").unwrap();
//!
//! let mut tree = SchemaTree::load("person", schema, data, Defaults::new()).unwrap();
//! let weight = tree.locate("weight").unwrap();
//! tree.update_value(weight, "61.2".into()).unwrap();
//! assert_eq!(tree.value(weight).unwrap(), serde_yaml::Value::from(61.2));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod defaults;
mod error;
mod event;
mod node;
mod ops;
mod tree;

pub use defaults::{Defaults, DefaultsError};
pub use error::TreeError;
pub use event::{CommitError, CommitHook, SubscriptionId, TreeEvent, TreeListener};
pub use node::{NodeId, NodeKey, NodeKind, NodeRef};
pub use tree::SchemaTree;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
