//! cfgtree schema layer
//!
//! The grammar and matching rules that govern a settings document.
//!
//! # Core Concepts
//!
//! - [`SchemaFragment`]: recursive schema grammar (exact types, mappings,
//!   sequences, wildcard)
//! - [`KeyMatcher`]: how a mapping entry selects the keys it governs
//! - [`resolve_child_schema`]: which sub-schema applies to a child key
//! - [`Validator`] / [`KeyValidator`]: per-node gates run before every edit
//! - [`SchemaPath`]: schema-derived node paths, used to look up defaults
//!
//! # Example
//!
//! ```rust
//! use cfgtree_schema::{validate, SchemaFragment};
//!
//! let schema = SchemaFragment::mapping()
//!     .key("name", SchemaFragment::string())
//!     .key("age", SchemaFragment::integer())
//!     .build();
//!
//! let data: serde_yaml::Value = serde_yaml::from_str("{name: Ann, age: 30}").unwrap();
//! assert!(validate(&schema, &data).is_ok());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod data;
mod fragment;
mod matcher;
mod path;
mod validate;

pub mod loader;

pub use data::{describe, label, PlainData};
pub use fragment::{
    KeyMatcher, KeyPredicate, MappingBuilder, MappingEntry, PrimitiveType, SchemaFragment,
};
pub use loader::{parse_schema, LoadError};
pub use matcher::{matching_entry, resolve_child_schema, ChildSchema};
pub use path::{PathError, PathSegment, SchemaPath};
pub use validate::{coerce_float, validate, KeyValidator, SchemaError, Validator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
