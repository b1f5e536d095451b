//! Tree root and node arena
//!
//! [`SchemaTree`] is the data source renderers talk to: it owns every node,
//! the defaults table, the listeners and the commit hook. Container values are
//! never stored, only derived from their children, so a parent's document and
//! its children cannot drift apart.

use std::collections::HashSet;
use std::sync::Arc;

use cfgtree_schema::{
    describe, resolve_child_schema, validate, ChildSchema, KeyValidator, PathSegment,
    PlainData, SchemaError, SchemaFragment, SchemaPath, Validator,
};
use serde_yaml::Value;
use tracing::{debug, error};

use crate::defaults::Defaults;
use crate::error::TreeError;
use crate::event::{CommitHook, Subscription, SubscriptionId, TreeEvent, TreeListener};
use crate::node::{Content, NodeId, NodeKey, NodeRef, NodeSlot};

/// Arena slot; `generation` counts how often the slot was freed
struct Entry {
    generation: u32,
    slot: Option<NodeSlot>,
}

/// Editable settings tree bound to a schema
///
/// Node slots freed by edits are recycled, so replacing a subtree over and
/// over keeps the arena at the size of the largest document seen.
pub struct SchemaTree {
    name: String,
    nodes: Vec<Entry>,
    free: Vec<usize>,
    root: NodeId,
    defaults: Defaults,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
    hook: Option<Box<dyn CommitHook>>,
}

impl SchemaTree {
    /// Build the tree for `data`
    ///
    /// `name` identifies the root node (its key). The document must validate
    /// against `schema` and must be a mapping.
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidDocument`] if the document is rejected
    pub fn load(
        name: impl Into<String>,
        schema: SchemaFragment,
        data: PlainData,
        defaults: Defaults,
    ) -> Result<Self, TreeError> {
        Self::load_shared(name, Arc::new(schema), data, defaults)
    }

    /// Like [`Self::load`] for a schema that is already shared
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidDocument`] if the document is rejected
    pub fn load_shared(
        name: impl Into<String>,
        schema: Arc<SchemaFragment>,
        data: PlainData,
        defaults: Defaults,
    ) -> Result<Self, TreeError> {
        let name = name.into();
        validate(&schema, &data)?;
        if !matches!(data, Value::Mapping(_)) {
            return Err(TreeError::InvalidDocument(SchemaError {
                location: "<root>".to_string(),
                message: format!("expected mapping, got {}", describe(&data)),
            }));
        }

        let mut tree = Self {
            name: name.clone(),
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(0, 0),
            defaults,
            subscriptions: Vec::new(),
            next_subscription: 0,
            hook: None,
        };
        let root_schema = ChildSchema {
            key_matcher: None,
            schema: Some(schema),
            segment: None,
        };
        tree.root = tree.build_node(NodeKey::Root(name), data, None, root_schema)?;

        debug!(name = %tree.name, nodes = tree.node_count(), "loaded settings tree");
        Ok(tree)
    }

    /// Install the hook run after every successful edit
    pub fn set_commit_hook(&mut self, hook: impl CommitHook + 'static) {
        self.hook = Some(Box::new(hook));
    }

    /// Builder form of [`Self::set_commit_hook`]
    #[must_use]
    pub fn with_commit_hook(mut self, hook: impl CommitHook + 'static) -> Self {
        self.set_commit_hook(hook);
        self
    }

    /// Remove and return the current commit hook
    pub fn take_commit_hook(&mut self) -> Option<Box<dyn CommitHook>> {
        self.hook.take()
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Number of live nodes, root included
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|entry| entry.slot.is_some()).count()
    }

    /// Read view of `id`, if it is still part of the tree
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get_slot(id).map(|slot| NodeRef::new(self, id, slot))
    }

    /// Like [`Self::node`], failing with [`TreeError::NodeNotFound`]
    ///
    /// # Errors
    /// Returns error if the node was removed or never existed
    pub fn get(&self, id: NodeId) -> Result<NodeRef<'_>, TreeError> {
        self.slot(id).map(|slot| NodeRef::new(self, id, slot))
    }

    /// Current value of `id`
    ///
    /// # Errors
    /// Returns error if the node does not exist
    pub fn value(&self, id: NodeId) -> Result<PlainData, TreeError> {
        self.slot(id).map(|slot| self.materialize(slot))
    }

    /// Full document: ordered mappings, sequences and raw scalars
    #[must_use]
    pub fn to_document(&self) -> PlainData {
        self.value(self.root).unwrap_or_default()
    }

    /// Child of `parent` stored under mapping key `key`
    #[must_use]
    pub fn child_by_key(&self, parent: NodeId, key: &PlainData) -> Option<NodeId> {
        let slot = self.get_slot(parent)?;
        slot.content
            .children()
            .iter()
            .copied()
            .find(|&child| self.get_slot(child).is_some_and(|c| c.key.as_data() == *key))
    }

    /// Find a node by its dotted live-key address
    ///
    /// Mapping children are matched by key label, sequence children by index:
    /// `servers.main.port`, `tags.0`. The empty address is the root.
    #[must_use]
    pub fn locate(&self, address: &str) -> Option<NodeId> {
        if address.is_empty() {
            return Some(self.root);
        }
        address.split('.').try_fold(self.root, |current, segment| {
            let slot = self.get_slot(current)?;
            match &slot.content {
                Content::Map(children) => children
                    .iter()
                    .copied()
                    .find(|&child| {
                        self.get_slot(child)
                            .is_some_and(|c| c.key.to_string() == segment)
                    }),
                Content::Sequence(children) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| children.get(index).copied()),
                Content::Scalar(_) => None,
            }
        })
    }

    /// Dotted live-key address of `id`, the inverse of [`Self::locate`]
    #[must_use]
    pub fn address(&self, id: NodeId) -> Option<String> {
        let mut keys = Vec::new();
        let mut current = self.get_slot(id)?;
        while let Some(parent) = current.parent {
            keys.push(current.key.to_string());
            current = self.get_slot(parent)?;
        }
        keys.reverse();
        Some(keys.join("."))
    }

    /// Default a new child of `id` would start from
    #[must_use]
    pub fn default_for(&self, id: NodeId) -> Option<&PlainData> {
        self.get_slot(id)
            .and_then(|slot| self.defaults.get(&slot.path))
    }

    /// Register `listener` for events at `node` or anywhere below it
    ///
    /// The subscription ends with [`Self::unsubscribe`] or when the node
    /// leaves the tree.
    ///
    /// # Errors
    /// Returns error if the node does not exist
    pub fn subscribe(
        &mut self,
        node: NodeId,
        listener: impl TreeListener + 'static,
    ) -> Result<SubscriptionId, TreeError> {
        self.slot(node)?;
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push(Subscription {
            id,
            node,
            listener: Box::new(listener),
        });
        Ok(id)
    }

    /// Drop a subscription; returns `false` if it was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub(crate) fn get_slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes
            .get(id.index)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.slot.as_ref())
    }

    pub(crate) fn slot(&self, id: NodeId) -> Result<&NodeSlot, TreeError> {
        self.get_slot(id).ok_or(TreeError::NodeNotFound(id))
    }

    pub(crate) fn slot_mut(&mut self, id: NodeId) -> Result<&mut NodeSlot, TreeError> {
        self.nodes
            .get_mut(id.index)
            .filter(|entry| entry.generation == id.generation)
            .and_then(|entry| entry.slot.as_mut())
            .ok_or(TreeError::NodeNotFound(id))
    }

    /// Place `slot` in a freed entry if there is one
    fn allocate(&mut self, slot: NodeSlot) -> NodeId {
        if let Some(index) = self.free.pop() {
            if let Some(entry) = self.nodes.get_mut(index) {
                entry.slot = Some(slot);
                return NodeId::new(index, entry.generation);
            }
        }
        self.nodes.push(Entry {
            generation: 0,
            slot: Some(slot),
        });
        NodeId::new(self.nodes.len() - 1, 0)
    }

    pub(crate) fn materialize(&self, slot: &NodeSlot) -> PlainData {
        match &slot.content {
            Content::Scalar(value) => value.clone(),
            Content::Sequence(children) => Value::Sequence(
                children
                    .iter()
                    .filter_map(|&child| self.get_slot(child))
                    .map(|child| self.materialize(child))
                    .collect(),
            ),
            Content::Map(children) => Value::Mapping(
                children
                    .iter()
                    .filter_map(|&child| self.get_slot(child))
                    .map(|child| (child.key.as_data(), self.materialize(child)))
                    .collect(),
            ),
        }
    }

    /// Allocate a node for `value` and, recursively, its children
    pub(crate) fn build_node(
        &mut self,
        key: NodeKey,
        value: PlainData,
        parent: Option<NodeId>,
        resolved: ChildSchema,
    ) -> Result<NodeId, TreeError> {
        let ChildSchema {
            key_matcher,
            schema,
            segment,
        } = resolved;

        let path = match parent {
            None => SchemaPath::root(),
            Some(parent) => {
                let parent = self.slot(parent)?;
                let segment = segment.unwrap_or_else(|| PathSegment::Key(parent.key.as_data()));
                parent.path.child(segment)
            }
        };

        let id = self.allocate(NodeSlot {
            key,
            parent,
            content: Content::Scalar(Value::Null),
            validator: Validator::new(schema.clone()),
            key_validator: key_matcher.clone().map(KeyValidator::new),
            schema,
            key_matcher,
            path,
        });

        let content = self.build_content(id, value)?;
        self.slot_mut(id)?.content = content;
        Ok(id)
    }

    /// Build the children of `id` for `value`
    pub(crate) fn build_content(
        &mut self,
        id: NodeId,
        value: PlainData,
    ) -> Result<Content, TreeError> {
        let schema = self.slot(id)?.schema.clone();
        match value {
            Value::Mapping(map) => {
                let mut children = Vec::with_capacity(map.len());
                for (key, child) in map {
                    let resolved = resolve_child_schema(schema.as_deref(), &key);
                    children.push(self.build_node(NodeKey::Key(key), child, Some(id), resolved)?);
                }
                Ok(Content::Map(children))
            }
            Value::Sequence(items) => {
                let mut children = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let resolved = resolve_child_schema(schema.as_deref(), &Value::from(index));
                    children.push(self.build_node(
                        NodeKey::Index(index),
                        item,
                        Some(id),
                        resolved,
                    )?);
                }
                Ok(Content::Sequence(children))
            }
            scalar => Ok(Content::Scalar(scalar)),
        }
    }

    /// Free `id` and its descendants, dropping their subscriptions
    pub(crate) fn release(&mut self, id: NodeId) {
        let mut released = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(entry) = self
                .nodes
                .get_mut(current.index)
                .filter(|entry| entry.generation == current.generation)
            else {
                continue;
            };
            if let Some(slot) = entry.slot.take() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(current.index);
                stack.extend_from_slice(slot.content.children());
                released.insert(current);
            }
        }
        self.subscriptions.retain(|s| !released.contains(&s.node));
    }

    /// Deliver `event` at its origin, then at each ancestor up to the root
    pub(crate) fn emit(&mut self, event: &TreeEvent) {
        let mut chain = Vec::new();
        let mut current = Some(event.origin());
        while let Some(id) = current {
            chain.push(id);
            current = self.get_slot(id).and_then(|slot| slot.parent);
        }

        for node in chain {
            for subscription in self.subscriptions.iter_mut().filter(|s| s.node == node) {
                subscription.listener.on_event(event);
            }
        }
    }

    /// Hand the document to the commit hook; failures are logged only
    pub(crate) fn commit(&mut self) {
        let Some(mut hook) = self.hook.take() else {
            return;
        };
        let document = self.to_document();
        debug!(name = %self.name, "committing settings");
        if let Err(err) = hook.on_commit(&document) {
            error!(name = %self.name, error = %err, "failed to persist settings");
        }
        self.hook = Some(hook);
    }
}

impl std::fmt::Debug for SchemaTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaTree")
            .field("name", &self.name)
            .field("nodes", &self.node_count())
            .field("subscriptions", &self.subscriptions.len())
            .field("has_commit_hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use cfgtree_schema::PrimitiveType;
    use pretty_assertions::assert_eq;

    fn yaml(s: &str) -> PlainData {
        serde_yaml::from_str(s).unwrap()
    }

    fn servers_schema() -> SchemaFragment {
        SchemaFragment::mapping()
            .key("name", SchemaFragment::string())
            .key(
                "servers",
                SchemaFragment::mapping()
                    .typed_key(
                        PrimitiveType::String,
                        SchemaFragment::mapping()
                            .key("port", SchemaFragment::integer())
                            .build(),
                    )
                    .build(),
            )
            .key("tags", SchemaFragment::sequence_of(SchemaFragment::string()))
            .build()
    }

    fn servers_tree() -> SchemaTree {
        SchemaTree::load(
            "settings",
            servers_schema(),
            yaml("{name: api, servers: {main: {port: 80}}, tags: [a, b]}"),
            Defaults::new(),
        )
        .unwrap()
    }

    #[test]
    fn builds_nodes_with_schema_paths() {
        let tree = servers_tree();
        let port = tree.locate("servers.main.port").unwrap();
        let port = tree.node(port).unwrap();
        assert_eq!(port.kind(), NodeKind::Scalar);
        assert_eq!(port.value(), Value::from(80));
        assert_eq!(port.path().to_string(), "servers.<string>.port");

        let main = tree.node(port.parent().unwrap()).unwrap();
        assert!(main.is_key_editable());
        assert_eq!(main.path().to_string(), "servers.<string>");

        let tag = tree.node(tree.locate("tags.1").unwrap()).unwrap();
        assert_eq!(tag.key(), &NodeKey::Index(1));
        assert_eq!(tag.path().to_string(), "tags.[]");
    }

    #[test]
    fn root_has_empty_path_and_name_key() {
        let tree = servers_tree();
        let root = tree.node(tree.root()).unwrap();
        assert!(root.path().is_empty());
        assert_eq!(root.key(), &NodeKey::Root("settings".to_string()));
        assert_eq!(root.parent(), None);
        assert_eq!(tree.node_count(), 8);
    }

    #[test]
    fn document_round_trips() {
        let data = yaml("{name: api, servers: {main: {port: 80}}, tags: [a, b]}");
        let tree = SchemaTree::load("settings", servers_schema(), data.clone(), Defaults::new())
            .unwrap();
        assert_eq!(tree.to_document(), data);
    }

    #[test]
    fn rejects_invalid_documents() {
        let err = SchemaTree::load(
            "settings",
            servers_schema(),
            yaml("{name: api, servers: {main: {port: x}}, tags: []}"),
            Defaults::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TreeError::InvalidDocument(e) if e.location == "servers.main.port"));

        let err = SchemaTree::load("settings", SchemaFragment::Any, yaml("[1]"), Defaults::new())
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidDocument(_)));
    }

    #[test]
    fn unconstrained_children_extend_parent_segment() {
        let schema = SchemaFragment::mapping().key("extra", SchemaFragment::Any).build();
        let tree =
            SchemaTree::load("settings", schema, yaml("{extra: {a: 1}}"), Defaults::new()).unwrap();
        let a = tree.node(tree.locate("extra.a").unwrap()).unwrap();
        assert_eq!(a.schema(), None);
        assert_eq!(a.path().to_string(), "extra.extra");
    }

    #[test]
    fn locate_and_address() {
        let tree = servers_tree();
        assert_eq!(tree.locate(""), Some(tree.root()));
        assert_eq!(tree.locate("servers.missing"), None);
        assert_eq!(tree.locate("tags.9"), None);
        assert_eq!(tree.locate("name.deeper"), None);

        let port = tree.locate("servers.main.port").unwrap();
        assert_eq!(tree.address(port).as_deref(), Some("servers.main.port"));
        assert_eq!(tree.address(tree.root()).as_deref(), Some(""));
    }

    #[test]
    fn child_by_key() {
        let tree = servers_tree();
        let servers = tree.child_by_key(tree.root(), &Value::from("servers")).unwrap();
        assert!(tree.child_by_key(servers, &Value::from("main")).is_some());
        assert!(tree.child_by_key(servers, &Value::from("other")).is_none());
    }

    #[test]
    fn release_drops_subtree_and_subscriptions() {
        let mut tree = servers_tree();
        let servers = tree.locate("servers").unwrap();
        let port = tree.locate("servers.main.port").unwrap();
        tree.subscribe(port, |_: &TreeEvent| {}).unwrap();
        tree.subscribe(tree.root(), |_: &TreeEvent| {}).unwrap();

        tree.release(servers);
        assert!(tree.node(port).is_none());
        assert_eq!(tree.subscriptions.len(), 1);
    }

    #[test]
    fn replaced_subtrees_recycle_slots() {
        let mut tree = servers_tree();
        let tags = tree.locate("tags").unwrap();
        let first = tree.locate("tags.0").unwrap();

        for _ in 0..1000 {
            tree.update_value(tags, yaml("[a, b, c]")).unwrap();
        }
        assert_eq!(tree.node_count(), 9);
        assert_eq!(tree.nodes.len(), 9);

        let entry = &tree.nodes[first.index()];
        assert!(entry.slot.is_some());
        let reused = NodeId::new(first.index(), entry.generation);
        assert!(reused.generation() > 0);
        assert!(tree.node(first).is_none());
        assert!(tree.node(reused).is_some());
    }

    #[test]
    fn unsubscribe() {
        let mut tree = servers_tree();
        let id = tree.subscribe(tree.root(), |_: &TreeEvent| {}).unwrap();
        assert!(tree.unsubscribe(id));
        assert!(!tree.unsubscribe(id));
        assert!(matches!(
            tree.subscribe(NodeId::new(999, 0), |_: &TreeEvent| {}),
            Err(TreeError::NodeNotFound(_))
        ));
    }
}
