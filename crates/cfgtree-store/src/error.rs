//! Error types for settings persistence

use std::path::PathBuf;

use cfgtree_node::{DefaultsError, TreeError};
use cfgtree_schema::{LoadError, SchemaError};

/// Errors while reading, writing or recovering settings files
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error on a settings, example or backup file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid YAML, or a document could not be serialized
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Document does not match the schema
    #[error("{path} does not match schema: {source}")]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("settings file {0} not found and no example file provided")]
    MissingSettings(PathBuf),

    #[error("example file {0} not found")]
    MissingExample(PathBuf),

    #[error("no example file configured")]
    NoExample,

    #[error("no backup file at {0}")]
    MissingBackup(PathBuf),

    #[error("invalid schema: {0}")]
    Schema(#[from] LoadError),

    #[error("invalid defaults: {0}")]
    Defaults(#[from] DefaultsError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Background writer task is gone
    #[error("background writer has shut down")]
    WriterClosed,
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create YAML error for path
    pub fn yaml_error(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.into(),
            source,
        }
    }

    /// Check if the file content, rather than the filesystem, is at fault
    ///
    /// These are the failures an example file can recover from.
    #[inline]
    #[must_use]
    pub fn is_bad_content(&self) -> bool {
        match self {
            Self::Yaml { .. } | Self::InvalidDocument { .. } => true,
            Self::Tree(err) => !err.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_content() {
        let invalid = StoreError::InvalidDocument {
            path: "settings.yaml".into(),
            source: SchemaError {
                location: "age".into(),
                message: "expected integer, got string".into(),
            },
        };
        assert!(invalid.is_bad_content());
        assert_eq!(
            invalid.to_string(),
            "settings.yaml does not match schema: expected integer, got string (at age)"
        );

        let io = StoreError::io_error(
            "settings.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!io.is_bad_content());
        assert!(!StoreError::WriterClosed.is_bad_content());
    }
}
