//! cfgtree command line
//!
//! Library side of the `cfgtree` binary: input parsing, views and
//! subcommand execution, kept separate from argument handling so they can be
//! tested without a process.
//!
//! # Usage
//!
//! ```text
//! cfgtree --schema service.schema.yaml --file service.yaml show
//! cfgtree --schema service.schema.yaml --file service.yaml set servers.main.port 9090
//! cfgtree ... --defaults service.defaults.yaml add servers
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod commands;
pub mod input;
pub mod render;

pub use commands::{execute, Action};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
