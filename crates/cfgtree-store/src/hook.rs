//! Synchronous persistence hook

use cfgtree_node::{CommitError, CommitHook};
use cfgtree_schema::PlainData;

use crate::store::SettingsStore;

/// Saves every committed document to the settings file before returning
///
/// Documents that no longer match the schema are refused and the file keeps
/// its last valid content; the tree logs the refusal.
#[derive(Debug, Clone)]
pub struct YamlCommitHook {
    store: SettingsStore,
}

impl YamlCommitHook {
    #[inline]
    #[must_use]
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }
}

impl CommitHook for YamlCommitHook {
    fn on_commit(&mut self, document: &PlainData) -> Result<(), CommitError> {
        self.store.save(document).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::files::read_yaml;
    use cfgtree_test_utils::{person_schema, yaml};

    #[test]
    fn saves_valid_and_refuses_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.yaml");
        let store = SettingsStore::new(StoreConfig::new("person", &path), person_schema());
        let mut hook = store.commit_hook();

        let good = yaml("{name: Ann, age: 30, weight: 60.5}");
        hook.on_commit(&good).unwrap();
        assert_eq!(read_yaml(&path).unwrap(), good);

        assert!(hook.on_commit(&yaml("{name: Ann}")).is_err());
        assert_eq!(read_yaml(&path).unwrap(), good);
    }
}
