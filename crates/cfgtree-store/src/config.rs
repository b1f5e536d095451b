//! Store configuration

use std::path::{Path, PathBuf};

/// Suffix appended to the settings file name for the recovery copy
pub const BACKUP_SUFFIX: &str = ".backup";

/// Where a settings document lives and what to fall back to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Identifier of the settings tree's root
    pub name: String,
    /// Settings file read at startup and written on every commit
    pub settings_file: PathBuf,
    /// Known-good document used when the settings file is missing or broken
    pub example_file: Option<PathBuf>,
}

impl StoreConfig {
    /// Create config for `settings_file` with no example fallback
    pub fn new(name: impl Into<String>, settings_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            settings_file: settings_file.into(),
            example_file: None,
        }
    }

    /// Set the example file used for first runs and recovery
    #[must_use]
    pub fn with_example(mut self, example_file: impl Into<PathBuf>) -> Self {
        self.example_file = Some(example_file.into());
        self
    }

    /// Path of the recovery copy of an invalid settings file
    #[must_use]
    pub fn backup_file(&self) -> PathBuf {
        let mut name = self.settings_file.as_os_str().to_owned();
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    #[inline]
    #[must_use]
    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }

    #[inline]
    #[must_use]
    pub fn example_file(&self) -> Option<&Path> {
        self.example_file.as_deref()
    }
}
