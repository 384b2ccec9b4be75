//! Bidirectional synchronization between controls and the remote store.
//!
//! Local edits flow through coercion and one `set_value` call; the node's
//! error flag tracks the outcome and the failure propagates to the caller.
//! Remote-initiated refreshes descend a compound value and rewrite the
//! display text of the leaves that exist in the live tree.
//!
//! The engine is synchronous: an edit owns its path until the transport
//! call returns, so overlapping edits to one path cannot interleave.

use serde_json::Value;

use soma_forms_path::{child_path, format_path};

use crate::coerce::{coerce, display, RawInput};
use crate::error::FormError;
use crate::transport::Transport;
use crate::tree::{FormTree, NodeId, NodeRole};

/// Handle a local edit of the control at `path`.
///
/// The raw input is coerced to the node's controller type; a coercion
/// failure sets the error flag and returns without contacting the store.
/// On success the value is pushed with `set_value`; the flag clears on
/// acceptance and sets on rejection or transport failure. The displayed
/// text stays as typed either way.
pub fn on_local_change<T: Transport>(
    tree: &mut FormTree,
    transport: &mut T,
    path: &[String],
    raw: &RawInput,
) -> Result<(), FormError> {
    let serialized = format_path(path);
    let id = tree
        .node_at(&serialized)
        .ok_or_else(|| FormError::UnknownPath(serialized.clone()))?;
    let node = tree
        .get_mut(id)
        .ok_or_else(|| FormError::UnknownPath(serialized.clone()))?;
    match raw {
        RawInput::Text(text) => node.text = text.clone(),
        RawInput::Flag(flag) => node.text = if *flag { "true".into() } else { "false".into() },
    }
    let controller_type = node.controller_type.clone();
    let coerced = match coerce(&controller_type, raw) {
        Ok(value) => value,
        Err(error) => {
            tree.set_error(id, true);
            return Err(error.into());
        }
    };
    match transport.set_value(path, coerced) {
        Ok(_) => {
            tree.set_error(id, false);
            Ok(())
        }
        Err(error) => {
            log::debug!("set_value rejected at {serialized:?}: {error}");
            tree.set_error(id, true);
            Err(error.into())
        }
    }
}

/// Apply an authoritative value from the store to the subtree at `path`.
///
/// Containers recurse per child key or index; children with no live node
/// are skipped (they are expected to come from the structural operation
/// that triggered the refresh). Leaf controls get their display text
/// rewritten in place.
pub fn on_remote_value(tree: &mut FormTree, path: &[String], value: &Value) {
    let serialized = format_path(path);
    let Some(id) = tree.node_at(&serialized) else {
        return;
    };
    apply_remote(tree, id, path, value);
}

fn apply_remote(tree: &mut FormTree, id: NodeId, path: &[String], value: &Value) {
    let role = match tree.get(id) {
        Some(node) => node.role.clone(),
        None => return,
    };
    match role {
        NodeRole::Container => match value {
            Value::Object(members) => {
                for (name, member) in members {
                    on_remote_value(tree, &child_path(path, name), member);
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    on_remote_value(tree, &child_path(path, &index.to_string()), item);
                }
            }
            _ => {}
        },
        NodeRole::Control(_) => {
            if let Some(node) = tree.get_mut(id) {
                node.text = display(&node.controller_type, value);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::WidgetFactory;
    use crate::store::MemoryTransport;
    use serde_json::{json, Value};
    use soma_forms_schema::resolve;

    fn session(schema: Value, value: Value) -> (FormTree, WidgetFactory, MemoryTransport) {
        let transport = MemoryTransport::new(schema.clone(), value.clone());
        let factory = WidgetFactory::new(schema.clone());
        let resolved = resolve(&schema, &schema).unwrap();
        let mut tree = FormTree::new();
        let roots = factory
            .build(&mut tree, &[], None, &resolved, &value)
            .unwrap();
        tree.set_roots(roots);
        (tree, factory, transport)
    }

    #[test]
    fn local_edit_pushes_coerced_value() {
        let schema = json!({
            "type": "object",
            "properties": {"n": {"type": "integer"}},
        });
        let (mut tree, _, mut transport) = session(schema, json!({"n": 5}));
        let path = vec!["n".to_string()];
        on_local_change(&mut tree, &mut transport, &path, &RawInput::Text("6".into())).unwrap();
        assert_eq!(transport.value()["n"], json!(6));
        let node = tree.get(tree.node_at("n").unwrap()).unwrap();
        assert!(!node.error);
        assert_eq!(node.text, "6");
    }

    #[test]
    fn coercion_failure_never_reaches_the_store() {
        let schema = json!({
            "type": "object",
            "properties": {"li": {"type": "array", "items": {"type": "integer"}}},
        });
        let (mut tree, _, mut transport) = session(schema, json!({"li": [1]}));
        let path = vec!["li".to_string()];
        let err = on_local_change(
            &mut tree,
            &mut transport,
            &path,
            &RawInput::Text("3,a,5".into()),
        )
        .unwrap_err();
        assert!(matches!(err, FormError::Coerce(_)));
        assert!(tree.get(tree.node_at("li").unwrap()).unwrap().error);
        // The store still holds the original value.
        assert_eq!(transport.value()["li"], json!([1]));
    }

    #[test]
    fn whitespace_separated_integers_sync_as_one_array() {
        let schema = json!({
            "type": "object",
            "properties": {"li": {"type": "array", "items": {"type": "integer"}}},
        });
        let (mut tree, _, mut transport) = session(schema, json!({"li": [1]}));
        let path = vec!["li".to_string()];
        on_local_change(
            &mut tree,
            &mut transport,
            &path,
            &RawInput::Text("3 4 5".into()),
        )
        .unwrap();
        assert_eq!(transport.value()["li"], json!([3, 4, 5]));
        assert!(!tree.get(tree.node_at("li").unwrap()).unwrap().error);
    }

    #[test]
    fn remote_rejection_sets_flag_and_propagates() {
        let schema = json!({
            "type": "object",
            "properties": {"n": {"type": "integer"}},
        });
        let (mut tree, _, mut transport) = session(schema, json!({"n": 5}));
        let path = vec!["n".to_string()];
        let missing = vec!["ghost".to_string()];
        let err = on_local_change(
            &mut tree,
            &mut transport,
            &missing,
            &RawInput::Text("1".into()),
        )
        .unwrap_err();
        assert!(matches!(err, FormError::UnknownPath(_)));
        // A store-side rejection on a live node:
        transport.poison_path("n");
        let err = on_local_change(&mut tree, &mut transport, &path, &RawInput::Text("6".into()))
            .unwrap_err();
        assert!(matches!(err, FormError::Transport(_)));
        assert!(tree.get(tree.node_at("n").unwrap()).unwrap().error);
        // Next successful sync clears the flag.
        transport.heal_path("n");
        on_local_change(&mut tree, &mut transport, &path, &RawInput::Text("7".into())).unwrap();
        assert!(!tree.get(tree.node_at("n").unwrap()).unwrap().error);
    }

    #[test]
    fn remote_value_descends_and_skips_absent_children() {
        let schema = json!({
            "type": "object",
            "properties": {
                "o": {"type": "object", "properties": {
                    "s": {"type": "string"},
                    "n": {"type": "integer"},
                }},
            }
        });
        let (mut tree, _, _) = session(schema, json!({"o": {"s": "x", "n": 1}}));
        on_remote_value(
            &mut tree,
            &[],
            &json!({"o": {"s": "y", "n": 2, "ghost": true}}),
        );
        assert_eq!(tree.get(tree.node_at("o/s").unwrap()).unwrap().text, "y");
        assert_eq!(tree.get(tree.node_at("o/n").unwrap()).unwrap().text, "2");
        assert!(tree.node_at("o/ghost").is_none());
    }
}
