//! Text and JSON views of a settings tree
//!
//! The text view is what an editor would show: one line per node, indented by
//! depth, with markers for the actions the tree allows on that node.
//!
//! | marker | meaning |
//! |--------|---------|
//! | `+`    | a default can be added (`add`) |
//! | `x`    | the node can be removed (`remove`) |
//! | `~`    | the key can be renamed (`rename`) |

use std::fmt::Write as _;

use anyhow::Context;
use cfgtree_node::{NodeId, NodeKind, SchemaTree, TreeEvent};
use cfgtree_schema::label;

/// Render every node of `tree`, root first
#[must_use]
pub fn render_text(tree: &SchemaTree) -> String {
    let mut out = String::new();
    render_node(tree, tree.root(), 0, &mut out);
    out
}

fn render_node(tree: &SchemaTree, id: NodeId, depth: usize, out: &mut String) {
    let Some(node) = tree.node(id) else {
        return;
    };

    let indent = "  ".repeat(depth);
    let mut line = if depth == 0 {
        node.key().to_string()
    } else {
        format!("{indent}{}:", node.key())
    };
    if let Some(value) = node.scalar() {
        let _ = write!(line, " {}", label(value));
    } else if node.children().is_empty() {
        line.push_str(if node.kind() == NodeKind::Map { " {}" } else { " []" });
    }

    let markers = markers(tree, id);
    if !markers.is_empty() {
        let _ = write!(line, "  [{markers}]");
    }
    out.push_str(&line);
    out.push('\n');

    for &child in node.children() {
        render_node(tree, child, depth + 1, out);
    }
}

fn markers(tree: &SchemaTree, id: NodeId) -> String {
    let mut markers = String::new();
    if tree.can_add(id) {
        markers.push('+');
    }
    if tree.can_remove(id) {
        markers.push('x');
    }
    if tree.node(id).is_some_and(|n| n.is_key_editable()) {
        markers.push('~');
    }
    markers
}

/// Render the document as pretty-printed JSON
///
/// # Errors
/// Returns error if the document has keys JSON cannot represent
pub fn render_json(tree: &SchemaTree) -> anyhow::Result<String> {
    serde_json::to_string_pretty(&tree.to_document())
        .context("settings document cannot be represented as JSON")
}

/// One-line description of an event, using live-key addresses
#[must_use]
pub fn describe_event(tree: &SchemaTree, event: &TreeEvent) -> String {
    let address = |id: NodeId| {
        tree.address(id)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| tree.name().to_string())
    };
    match event {
        TreeEvent::Changed { node, .. } => format!("changed {}", address(*node)),
        TreeEvent::ChildAdded { child, .. } => format!("added {}", address(*child)),
        TreeEvent::ChildRemoved { parent, key } => {
            if *parent == tree.root() {
                format!("removed {key}")
            } else {
                format!("removed {}.{key}", address(*parent))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgtree_node::NodeKey;
    use cfgtree_test_utils::service_tree;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_view_with_markers() {
        let tree = service_tree();
        let expected = "\
service
  name: api
  servers:  [+]
    main:  [x~]
      host: localhost
      port: 8080
  tags:  [+]
    0: alpha  [x]
    1: beta  [x]
  limits:  [+]
    max_conn: 100  [x~]
";
        assert_eq!(render_text(&tree), expected);
    }

    #[test]
    fn json_view() {
        let tree = service_tree();
        let json: serde_json::Value = serde_json::from_str(&render_json(&tree).unwrap()).unwrap();
        assert_eq!(json["servers"]["main"]["port"], serde_json::json!(8080));
        assert_eq!(json["tags"], serde_json::json!(["alpha", "beta"]));
    }

    #[test]
    fn event_descriptions() {
        let tree = service_tree();
        let port = tree.locate("servers.main.port").unwrap();
        let servers = tree.locate("servers").unwrap();

        let changed = TreeEvent::Changed {
            node: port,
            key: NodeKey::Key("port".into()),
        };
        assert_eq!(describe_event(&tree, &changed), "changed servers.main.port");

        let removed = TreeEvent::ChildRemoved {
            parent: servers,
            key: NodeKey::Key("old".into()),
        };
        assert_eq!(describe_event(&tree, &removed), "removed servers.old");

        let removed_top = TreeEvent::ChildRemoved {
            parent: tree.root(),
            key: NodeKey::Key("debug".into()),
        };
        assert_eq!(describe_event(&tree, &removed_top), "removed debug");
    }
}
