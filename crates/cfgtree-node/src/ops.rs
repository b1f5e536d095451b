//! Edit operations
//!
//! Each edit runs its validation gate first and touches nothing on failure.
//! On success the order is fixed: tree mutation, events, commit hook.

use cfgtree_schema::{describe, label, resolve_child_schema, validate, PlainData};
use serde_yaml::Value;
use tracing::debug;

use crate::error::TreeError;
use crate::event::TreeEvent;
use crate::node::{Content, NodeId, NodeKey, NodeKind};
use crate::tree::SchemaTree;

impl SchemaTree {
    /// Replace the value of `node`
    ///
    /// Float schemas store the parsed float, so `"61.2"` becomes `61.2`.
    /// Container values rebuild the node's children; listeners on the old
    /// children are dropped with them.
    ///
    /// # Errors
    /// Returns [`TreeError::Validation`] if the node's validator rejects the value
    pub fn update_value(&mut self, node: NodeId, value: PlainData) -> Result<(), TreeError> {
        let slot = self.slot(node)?;
        let value = slot.validator.coerce(value).map_err(TreeError::Validation)?;
        if slot.parent.is_none() && !matches!(value, Value::Mapping(_)) {
            return Err(TreeError::Validation(format!(
                "not valid input: settings root must be a mapping, got {}",
                describe(&value)
            )));
        }

        let old_children = slot.content.children().to_vec();
        for child in old_children {
            self.release(child);
        }
        let content = self.build_content(node, value)?;
        let slot = self.slot_mut(node)?;
        slot.content = content;
        let key = slot.key.clone();

        debug!(node = %node, key = %key, "value updated");
        self.emit(&TreeEvent::Changed { node, key });
        self.commit();
        Ok(())
    }

    /// Rename `node` in place, keeping its value and position
    ///
    /// Only keys selected by a typed or predicate matcher are editable. The
    /// new key must still be governed by the same matcher.
    ///
    /// # Errors
    /// - [`TreeError::KeyNotEditable`] if the node has no key matcher
    /// - [`TreeError::Validation`] if the matcher rejects the key
    /// - [`TreeError::DuplicateKey`] if a sibling already uses the key
    /// - [`TreeError::SchemaConstraint`] if the parent would stop validating
    pub fn update_key(&mut self, node: NodeId, key: PlainData) -> Result<(), TreeError> {
        let slot = self.slot(node)?;
        let Some(key_validator) = &slot.key_validator else {
            return Err(TreeError::KeyNotEditable(node));
        };
        if let Some(message) = key_validator.check(&key) {
            return Err(TreeError::Validation(message));
        }
        let Some(parent) = slot.parent else {
            return Err(TreeError::KeyNotEditable(node));
        };

        let old = slot.key.as_data();
        if old == key {
            return Ok(());
        }
        if self.child_by_key(parent, &key).is_some() {
            return Err(TreeError::DuplicateKey(label(&key)));
        }

        let parent_slot = self.slot(parent)?;
        let resolved = resolve_child_schema(parent_slot.schema.as_deref(), &key);
        if resolved.key_matcher != slot.key_matcher {
            return Err(TreeError::SchemaConstraint(format!(
                "key '{}' is governed by a different schema entry",
                label(&key)
            )));
        }
        // Same matcher and same value, so this only fails for a parent that
        // did not validate before the rename.
        if let Some(schema) = parent_slot.schema.as_deref() {
            let candidate = renamed(self.materialize(parent_slot), &old, &key);
            validate(schema, &candidate).map_err(|e| TreeError::SchemaConstraint(e.to_string()))?;
        }

        let key = NodeKey::Key(key);
        self.slot_mut(node)?.key = key.clone();

        debug!(node = %node, key = %key, "key renamed");
        self.emit(&TreeEvent::Changed { node, key });
        self.commit();
        Ok(())
    }

    /// Add children to a container from `default`
    ///
    /// A sequence gets `default` appended as one element. A mapping gets the
    /// entries of `default` merged in, in order. One [`TreeEvent::ChildAdded`]
    /// is emitted per new child. Returns the new children.
    ///
    /// # Errors
    /// - [`TreeError::NotAContainer`] on scalar nodes
    /// - [`TreeError::NoDefault`] if the node's path has no declared default
    /// - [`TreeError::DuplicateKey`] if a merged key already exists
    /// - [`TreeError::Validation`] if the result does not fit the node's schema
    pub fn add_child(
        &mut self,
        node: NodeId,
        default: PlainData,
    ) -> Result<Vec<NodeId>, TreeError> {
        let slot = self.slot(node)?;
        if slot.content.kind() == NodeKind::Scalar {
            return Err(TreeError::NotAContainer(node));
        }
        if !self.defaults().contains(&slot.path) {
            return Err(TreeError::NoDefault(slot.path.clone()));
        }

        let next_index = slot.content.children().len();
        let (candidate, pending) = match self.materialize(slot) {
            Value::Sequence(mut items) => {
                items.push(default.clone());
                (
                    Value::Sequence(items),
                    vec![(NodeKey::Index(next_index), default)],
                )
            }
            Value::Mapping(mut map) => {
                let entries = match default {
                    Value::Mapping(entries) => entries,
                    other => {
                        return Err(TreeError::Validation(format!(
                            "not valid input: default for '{}' must be a mapping, got {}",
                            slot.path,
                            describe(&other)
                        )));
                    }
                };
                let mut pending = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    if map.contains_key(&key) {
                        return Err(TreeError::DuplicateKey(label(&key)));
                    }
                    map.insert(key.clone(), value.clone());
                    pending.push((NodeKey::Key(key), value));
                }
                (Value::Mapping(map), pending)
            }
            _ => return Err(TreeError::NotAContainer(node)),
        };
        if let Some(message) = slot.validator.check(&candidate) {
            return Err(TreeError::Validation(message));
        }

        let schema = slot.schema.clone();
        let mut added = Vec::with_capacity(pending.len());
        for (key, value) in pending {
            let resolved = resolve_child_schema(schema.as_deref(), &key.as_data());
            let child = self.build_node(key.clone(), value, Some(node), resolved)?;
            if let Some(children) = self.slot_mut(node)?.content.children_mut() {
                children.push(child);
            }
            added.push((child, key));
        }

        for (child, key) in &added {
            self.emit(&TreeEvent::ChildAdded {
                parent: node,
                child: *child,
                key: key.clone(),
            });
        }
        if !added.is_empty() {
            debug!(node = %node, added = added.len(), "children added");
            self.commit();
        }
        Ok(added.into_iter().map(|(child, _)| child).collect())
    }

    /// Add the declared default at `node`'s schema path
    ///
    /// # Errors
    /// Same as [`Self::add_child`]
    pub fn instantiate(&mut self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let slot = self.slot(node)?;
        let default = self
            .defaults()
            .get(&slot.path)
            .cloned()
            .ok_or_else(|| TreeError::NoDefault(slot.path.clone()))?;
        self.add_child(node, default)
    }

    /// Remove `child` from `parent`
    ///
    /// Later sequence siblings shift down one index.
    ///
    /// # Errors
    /// - [`TreeError::NotAChild`] if `child` does not belong to `parent`
    /// - [`TreeError::SchemaConstraint`] if the parent schema requires the key
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_removal(parent, child)?;
        let key = self.slot(child)?.key.clone();

        self.release(child);
        let parent_slot = self.slot_mut(parent)?;
        let is_sequence = matches!(parent_slot.content, Content::Sequence(_));
        let mut remaining = Vec::new();
        if let Some(children) = parent_slot.content.children_mut() {
            children.retain(|&c| c != child);
            if is_sequence {
                remaining.clone_from(children);
            }
        }
        for (index, sibling) in remaining.into_iter().enumerate() {
            self.slot_mut(sibling)?.key = NodeKey::Index(index);
        }

        debug!(parent = %parent, key = %key, "child removed");
        self.emit(&TreeEvent::ChildRemoved { parent, key });
        self.commit();
        Ok(())
    }

    /// Remove `node` from its parent
    ///
    /// # Errors
    /// [`TreeError::RootRemoval`] for the root, otherwise as [`Self::remove_child`]
    pub fn remove(&mut self, node: NodeId) -> Result<(), TreeError> {
        let parent = self.slot(node)?.parent.ok_or(TreeError::RootRemoval)?;
        self.remove_child(parent, node)
    }

    /// Check whether [`Self::remove`] would succeed
    #[must_use]
    pub fn can_remove(&self, node: NodeId) -> bool {
        self.get_slot(node)
            .and_then(|slot| slot.parent)
            .is_some_and(|parent| self.check_removal(parent, node).is_ok())
    }

    /// Check whether [`Self::instantiate`] has a default to add
    #[must_use]
    pub fn can_add(&self, node: NodeId) -> bool {
        self.get_slot(node).is_some_and(|slot| {
            slot.content.kind() != NodeKind::Scalar && self.defaults().contains(&slot.path)
        })
    }

    fn check_removal(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let child_slot = self.slot(child)?;
        let parent_slot = self.slot(parent)?;
        if child_slot.parent != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }

        // Sequence elements can always go; mapping keys may be required.
        if let (Content::Map(_), Some(schema)) = (&parent_slot.content, parent_slot.schema.as_deref())
        {
            let key = child_slot.key.as_data();
            let candidate = match self.materialize(parent_slot) {
                Value::Mapping(mut map) => {
                    map.remove(&key);
                    Value::Mapping(map)
                }
                other => other,
            };
            validate(schema, &candidate).map_err(|e| {
                TreeError::SchemaConstraint(format!("cannot remove '{}': {e}", label(&key)))
            })?;
        }
        Ok(())
    }
}

fn renamed(document: PlainData, old: &PlainData, new: &PlainData) -> PlainData {
    match document {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| if k == *old { (new.clone(), v) } else { (k, v) })
                .collect(),
        ),
        other => other,
    }
}
