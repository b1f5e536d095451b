//! Settings file lifecycle
//!
//! [`SettingsStore`] loads a settings document with example-file fallback,
//! keeps a `.backup` copy of files it had to replace, and saves only
//! documents that still match the schema.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cfgtree_node::{Defaults, SchemaTree};
use cfgtree_schema::{describe, validate, PlainData, SchemaError, SchemaFragment};
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::files::{ensure_parent, read_yaml, write_yaml};
use crate::hook::YamlCommitHook;

/// How [`SettingsStore::load`] obtained the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Settings file was present and valid
    Existing,
    /// Settings file was missing; the example was copied in its place
    CopiedExample,
    /// Settings file was invalid; it was saved to `backup` and replaced
    Recovered { backup: PathBuf },
}

/// Reads and writes one settings document against one schema
#[derive(Debug, Clone)]
pub struct SettingsStore {
    config: StoreConfig,
    schema: Arc<SchemaFragment>,
}

impl SettingsStore {
    pub fn new(config: StoreConfig, schema: SchemaFragment) -> Self {
        Self::with_shared_schema(config, Arc::new(schema))
    }

    pub fn with_shared_schema(config: StoreConfig, schema: Arc<SchemaFragment>) -> Self {
        Self { config, schema }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaFragment> {
        &self.schema
    }

    /// Check `document` as if it were read from `path`
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidDocument`] if the schema rejects the
    /// document or its root is not a mapping
    pub fn check(&self, path: &Path, document: &PlainData) -> Result<(), StoreError> {
        let invalid = |source: SchemaError| StoreError::InvalidDocument {
            path: path.to_path_buf(),
            source,
        };
        validate(&self.schema, document).map_err(invalid)?;
        if !matches!(document, Value::Mapping(_)) {
            return Err(invalid(SchemaError {
                location: "<root>".to_string(),
                message: format!("expected mapping, got {}", describe(document)),
            }));
        }
        Ok(())
    }

    /// Load the settings document
    ///
    /// A missing settings file is created from the example. An unreadable or
    /// invalid one is copied to the backup file and replaced by the example.
    /// The example is validated before anything is written.
    ///
    /// # Errors
    /// - [`StoreError::MissingSettings`] if there is no file and no example
    /// - [`StoreError::MissingExample`] if the example file does not exist
    /// - the original content error if the file is invalid and there is no example
    pub fn load(&self) -> Result<(PlainData, LoadOutcome), StoreError> {
        let settings = self.config.settings_file();

        if !settings.exists() {
            let example = self
                .config
                .example_file()
                .ok_or_else(|| StoreError::MissingSettings(settings.to_path_buf()))?;
            let data = self.read_valid_example(example)?;
            ensure_parent(settings)?;
            fs::copy(example, settings).map_err(|e| StoreError::io_error(settings, e))?;
            info!(
                settings = %settings.display(),
                example = %example.display(),
                "settings file created from example"
            );
            return Ok((data, LoadOutcome::CopiedExample));
        }

        let err = match self.read_valid(settings) {
            Ok(data) => {
                debug!(settings = %settings.display(), "loaded settings file");
                return Ok((data, LoadOutcome::Existing));
            }
            Err(err) if err.is_bad_content() => err,
            Err(err) => return Err(err),
        };
        let Some(example) = self.config.example_file() else {
            return Err(err);
        };

        let data = self.read_valid_example(example)?;
        let backup = self.config.backup_file();
        fs::copy(settings, &backup).map_err(|e| StoreError::io_error(&backup, e))?;
        fs::copy(example, settings).map_err(|e| StoreError::io_error(settings, e))?;
        warn!(
            settings = %settings.display(),
            backup = %backup.display(),
            error = %err,
            "invalid settings file backed up and replaced with example"
        );
        Ok((data, LoadOutcome::Recovered { backup }))
    }

    /// Load the document and build its tree
    ///
    /// The tree has no commit hook; attach [`Self::commit_hook`] or a
    /// [`crate::BackgroundWriter`] hook to persist edits.
    ///
    /// # Errors
    /// Returns error if loading fails or the document cannot form a tree
    pub fn open(&self, defaults: Defaults) -> Result<(SchemaTree, LoadOutcome), StoreError> {
        let (data, outcome) = self.load()?;
        let tree =
            SchemaTree::load_shared(self.config.name.clone(), Arc::clone(&self.schema), data, defaults)?;
        Ok((tree, outcome))
    }

    /// Commit hook that saves every committed document synchronously
    #[must_use]
    pub fn commit_hook(&self) -> YamlCommitHook {
        YamlCommitHook::new(self.clone())
    }

    /// Write `document` to the settings file
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidDocument`] without touching the file if the
    /// document does not match the schema
    pub fn save(&self, document: &PlainData) -> Result<(), StoreError> {
        let settings = self.config.settings_file();
        self.check(settings, document)?;
        write_yaml(settings, document)
    }

    /// Async form of [`Self::save`]
    ///
    /// # Errors
    /// Same as [`Self::save`]
    pub async fn save_async(&self, document: &PlainData) -> Result<(), StoreError> {
        let settings = self.config.settings_file();
        self.check(settings, document)?;
        let text =
            serde_yaml::to_string(document).map_err(|e| StoreError::yaml_error(settings, e))?;
        if let Some(dir) = settings.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io_error(dir, e))?;
        }
        tokio::fs::write(settings, text)
            .await
            .map_err(|e| StoreError::io_error(settings, e))?;
        debug!(settings = %settings.display(), "saved settings");
        Ok(())
    }

    /// Backup file left by an earlier recovery, if any
    #[must_use]
    pub fn pending_backup(&self) -> Option<PathBuf> {
        let backup = self.config.backup_file();
        backup.exists().then_some(backup)
    }

    /// Move the pending backup file to `dest`
    ///
    /// # Errors
    /// Returns [`StoreError::MissingBackup`] if there is none
    pub fn recover_backup(&self, dest: &Path) -> Result<PathBuf, StoreError> {
        let backup = self
            .pending_backup()
            .ok_or_else(|| StoreError::MissingBackup(self.config.backup_file()))?;
        ensure_parent(dest)?;
        fs::copy(&backup, dest).map_err(|e| StoreError::io_error(dest, e))?;
        fs::remove_file(&backup).map_err(|e| StoreError::io_error(&backup, e))?;
        info!(backup = %backup.display(), dest = %dest.display(), "backup settings saved");
        Ok(dest.to_path_buf())
    }

    /// Write `document` to `dest`, leaving the settings file alone
    ///
    /// # Errors
    /// Returns error if the document cannot be written
    pub fn export(&self, document: &PlainData, dest: &Path) -> Result<(), StoreError> {
        write_yaml(dest, document)?;
        info!(dest = %dest.display(), "settings exported");
        Ok(())
    }

    /// Read and validate the example document
    ///
    /// # Errors
    /// Returns error if no example is configured or it is missing or invalid
    pub fn load_example(&self) -> Result<PlainData, StoreError> {
        let example = self
            .config
            .example_file()
            .ok_or(StoreError::NoExample)?;
        self.read_valid_example(example)
    }

    /// Replace the whole tree with the example document
    ///
    /// Goes through the tree's root, so listeners and the commit hook see it
    /// like any other edit.
    ///
    /// # Errors
    /// Returns error if the example cannot be loaded or the tree rejects it
    pub fn reset(&self, tree: &mut SchemaTree) -> Result<(), StoreError> {
        let example = self.load_example()?;
        let root = tree.root();
        tree.update_value(root, example)?;
        info!(name = %tree.name(), "settings reset to example");
        Ok(())
    }

    fn read_valid(&self, path: &Path) -> Result<PlainData, StoreError> {
        let data = read_yaml(path)?;
        self.check(path, &data)?;
        Ok(data)
    }

    fn read_valid_example(&self, example: &Path) -> Result<PlainData, StoreError> {
        if !example.exists() {
            return Err(StoreError::MissingExample(example.to_path_buf()));
        }
        self.read_valid(example)
    }
}
