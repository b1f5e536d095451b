//! cfgtree persistence
//!
//! Keeps a settings tree and its YAML file in step.
//!
//! # Core Concepts
//!
//! - [`SettingsStore`]: load with example fallback and `.backup` recovery,
//!   validated save, export, reset
//! - [`YamlCommitHook`]: saves on every commit, synchronously
//! - [`BackgroundWriter`]: saves on a tokio task, one write at a time
//! - [`load_schema`] / [`load_defaults`]: read schema and defaults files

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod files;
mod hook;
mod store;
mod writer;

pub use config::{StoreConfig, BACKUP_SUFFIX};
pub use error::StoreError;
pub use files::{load_defaults, load_schema, read_yaml, write_yaml};
pub use hook::YamlCommitHook;
pub use store::{LoadOutcome, SettingsStore};
pub use writer::{BackgroundWriter, WriterHook, WriterStats};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
