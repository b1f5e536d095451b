//! YAML file helpers for documents, schemas and defaults

use std::fs;
use std::path::Path;

use cfgtree_node::Defaults;
use cfgtree_schema::{loader, PlainData, SchemaFragment};
use tracing::debug;

use crate::error::StoreError;

/// Read and parse a YAML file
///
/// # Errors
/// Returns error if the file cannot be read or is not YAML
pub fn read_yaml(path: &Path) -> Result<PlainData, StoreError> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::io_error(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| StoreError::yaml_error(path, e))
}

/// Serialize `document` as YAML to `path`, creating parent directories
///
/// # Errors
/// Returns error if serialization or any filesystem step fails
pub fn write_yaml(path: &Path, document: &PlainData) -> Result<(), StoreError> {
    let text = serde_yaml::to_string(document).map_err(|e| StoreError::yaml_error(path, e))?;
    ensure_parent(path)?;
    fs::write(path, text).map_err(|e| StoreError::io_error(path, e))?;
    debug!(path = %path.display(), "wrote YAML document");
    Ok(())
}

/// Create the directory `path` will live in, if missing
///
/// # Errors
/// Returns error if the directory cannot be created
pub fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| StoreError::io_error(dir, e))
        }
        _ => Ok(()),
    }
}

/// Load a schema written in YAML notation
///
/// # Errors
/// Returns error if the file cannot be read or is not valid schema notation
pub fn load_schema(path: &Path) -> Result<SchemaFragment, StoreError> {
    let value = read_yaml(path)?;
    Ok(loader::schema_from_value(&value)?)
}

/// Load a defaults table: a YAML mapping of schema paths to values
///
/// # Errors
/// Returns error if the file cannot be read or a key is not a schema path
pub fn load_defaults(path: &Path) -> Result<Defaults, StoreError> {
    let value = read_yaml(path)?;
    Ok(Defaults::from_document(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/settings.yaml");
        let document: PlainData = serde_yaml::from_str("{name: Ann, tags: [a, b]}").unwrap();

        write_yaml(&path, &document).unwrap();
        assert_eq!(read_yaml(&path).unwrap(), document);
    }

    #[test]
    fn read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_yaml(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn read_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "a: [1, 2").unwrap();
        assert!(matches!(read_yaml(&path), Err(StoreError::Yaml { .. })));
    }

    #[test]
    fn schema_and_defaults_files() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("schema.yaml");
        fs::write(&schema_path, "name: str\ntags: [str]\n").unwrap();
        let schema = load_schema(&schema_path).unwrap();
        assert_eq!(
            schema,
            SchemaFragment::mapping()
                .key("name", SchemaFragment::string())
                .key("tags", SchemaFragment::sequence_of(SchemaFragment::string()))
                .build()
        );

        let defaults_path = dir.path().join("defaults.yaml");
        fs::write(&defaults_path, "tags: new\n").unwrap();
        let defaults = load_defaults(&defaults_path).unwrap();
        assert_eq!(defaults.len(), 1);

        fs::write(&schema_path, "name: decimal\n").unwrap();
        assert!(matches!(load_schema(&schema_path), Err(StoreError::Schema(_))));
    }
}
