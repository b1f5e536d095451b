//! Subcommand execution
//!
//! Each action runs against an already-open tree. Edits persist through
//! whatever commit hook the caller attached.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use cfgtree_node::{NodeId, SchemaTree, TreeError};
use cfgtree_store::SettingsStore;
use tracing::debug;

use crate::input::{parse_key, parse_value};
use crate::render::{render_json, render_text};

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Show { json: bool },
    Set { address: String, value: String },
    Rename { address: String, key: String },
    Add { address: String },
    Remove { address: String },
    Reset,
    Export { dest: PathBuf },
    RecoverBackup { dest: PathBuf },
}

impl Action {
    /// Check if the action edits the tree
    #[must_use]
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Self::Set { .. } | Self::Rename { .. } | Self::Add { .. } | Self::Remove { .. } | Self::Reset
        )
    }
}

/// Run `action`, returning the text to print
///
/// # Errors
/// Returns error if the address does not resolve or the tree or store
/// rejects the action
pub fn execute(
    action: &Action,
    store: &SettingsStore,
    tree: &mut SchemaTree,
) -> anyhow::Result<String> {
    debug!(?action, "executing");
    match action {
        Action::Show { json: false } => Ok(render_text(tree)),
        Action::Show { json: true } => render_json(tree),
        Action::Set { address, value } => {
            let node = locate(tree, address)?;
            let current = tree.get(node)?.scalar().cloned();
            let parsed = parse_value(current.as_ref(), value);
            if current.as_ref() == Some(&parsed) {
                return Ok(format!("{address} unchanged"));
            }
            tree.update_value(node, parsed)
                .map_err(|e| edit_error(e, "set", address))?;
            Ok(format!("{address} updated"))
        }
        Action::Rename { address, key } => {
            let node = locate(tree, address)?;
            let parsed = parse_key(tree.get(node)?.key_matcher(), key);
            tree.update_key(node, parsed)
                .map_err(|e| edit_error(e, "rename", address))?;
            Ok(format!("{address} renamed to {key}"))
        }
        Action::Add { address } => {
            let node = locate(tree, address)?;
            let added = tree
                .instantiate(node)
                .map_err(|e| edit_error(e, "add to", address))?;
            Ok(format!("{} item(s) added to {address}", added.len()))
        }
        Action::Remove { address } => {
            let node = locate(tree, address)?;
            tree.remove(node)
                .map_err(|e| edit_error(e, "remove", address))?;
            Ok(format!("{address} removed"))
        }
        Action::Reset => {
            store.reset(tree).context("cannot reset settings")?;
            Ok("settings reset to example".to_string())
        }
        Action::Export { dest } => {
            store.export(&tree.to_document(), dest)?;
            Ok(format!("settings exported to {}", dest.display()))
        }
        Action::RecoverBackup { dest } => {
            let dest = store.recover_backup(dest)?;
            Ok(format!("backup settings saved to {}", dest.display()))
        }
    }
}

/// Schema rejections read as the reason; anything else keeps its chain
fn edit_error(err: TreeError, verb: &str, address: &str) -> anyhow::Error {
    if err.is_rejection() {
        anyhow!("{address} rejected: {err}")
    } else {
        anyhow::Error::new(err).context(format!("cannot {verb} {address}"))
    }
}

fn locate(tree: &SchemaTree, address: &str) -> anyhow::Result<NodeId> {
    if address.is_empty() {
        bail!("empty address; use dotted keys such as servers.main.port");
    }
    tree.locate(address)
        .ok_or_else(|| anyhow!("no setting at '{address}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgtree_store::StoreConfig;
    use cfgtree_test_utils::{service_defaults, service_schema, yaml, SERVICE_DOCUMENT};
    use pretty_assertions::assert_eq;
    use serde_yaml::Value;
    use std::fs;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> (SettingsStore, SchemaTree) {
        let path = dir.path().join("service.yaml");
        fs::write(&path, SERVICE_DOCUMENT).unwrap();
        let example = dir.path().join("example.yaml");
        fs::write(&example, SERVICE_DOCUMENT).unwrap();

        let config = StoreConfig::new("service", &path).with_example(example);
        let store = SettingsStore::new(config, service_schema());
        let (mut tree, _) = store.open(service_defaults()).unwrap();
        tree.set_commit_hook(store.commit_hook());
        (store, tree)
    }

    fn saved(store: &SettingsStore) -> Value {
        cfgtree_store::read_yaml(store.config().settings_file()).unwrap()
    }

    #[test]
    fn set_parses_by_current_type_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let (store, mut tree) = open(&dir);

        let action = Action::Set {
            address: "servers.main.port".into(),
            value: "9090".into(),
        };
        assert_eq!(execute(&action, &store, &mut tree).unwrap(), "servers.main.port updated");
        assert_eq!(saved(&store)["servers"]["main"]["port"], Value::from(9090));

        assert_eq!(
            execute(&action, &store, &mut tree).unwrap(),
            "servers.main.port unchanged"
        );
    }

    #[test]
    fn set_rejects_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let (store, mut tree) = open(&dir);
        let action = Action::Set {
            address: "servers.main.port".into(),
            value: "eighty".into(),
        };
        let err = execute(&action, &store, &mut tree).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("servers.main.port rejected: "));
        assert!(message.contains("not valid input"));

        let remove = Action::Remove {
            address: "name".into(),
        };
        let err = execute(&remove, &store, &mut tree).unwrap_err();
        assert!(err.to_string().starts_with("name rejected: "));
    }

    #[test]
    fn rename_add_remove() {
        let dir = tempfile::tempdir().unwrap();
        let (store, mut tree) = open(&dir);

        let rename = Action::Rename {
            address: "servers.main".into(),
            key: "primary".into(),
        };
        execute(&rename, &store, &mut tree).unwrap();

        let add = Action::Add {
            address: "servers".into(),
        };
        assert_eq!(
            execute(&add, &store, &mut tree).unwrap(),
            "1 item(s) added to servers"
        );

        let remove = Action::Remove {
            address: "tags.0".into(),
        };
        execute(&remove, &store, &mut tree).unwrap();

        assert_eq!(
            saved(&store),
            yaml(
                r#"
name: api
servers:
  primary: {host: localhost, port: 8080}
  new_server: {host: localhost, port: 80}
tags: [beta]
limits: {max_conn: 100}
"#
            )
        );
    }

    #[test]
    fn unknown_address() {
        let dir = tempfile::tempdir().unwrap();
        let (store, mut tree) = open(&dir);
        let action = Action::Remove {
            address: "servers.nowhere".into(),
        };
        let err = execute(&action, &store, &mut tree).unwrap_err();
        assert_eq!(err.to_string(), "no setting at 'servers.nowhere'");
    }

    #[test]
    fn reset_and_export() {
        let dir = tempfile::tempdir().unwrap();
        let (store, mut tree) = open(&dir);

        let remove = Action::Remove {
            address: "limits.max_conn".into(),
        };
        execute(&remove, &store, &mut tree).unwrap();
        execute(&Action::Reset, &store, &mut tree).unwrap();
        assert_eq!(saved(&store), yaml(SERVICE_DOCUMENT));

        let dest = dir.path().join("out.yaml");
        execute(&Action::Export { dest: dest.clone() }, &store, &mut tree).unwrap();
        assert_eq!(cfgtree_store::read_yaml(&dest).unwrap(), yaml(SERVICE_DOCUMENT));
    }

    #[test]
    fn edit_actions() {
        assert!(Action::Reset.is_edit());
        assert!(!Action::Show { json: true }.is_edit());
    }
}
