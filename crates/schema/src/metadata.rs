//! Vendor metadata block.
//!
//! Schema nodes may carry a vendor object under the [`VENDOR_KEY`] member
//! with presentation and membership hints: `order` (sibling display order),
//! `path_type` (refines `string` into a file or directory path),
//! `class_field` (marks a property as non-removable), and `value_items`
//! (the schema of dynamically-added object members; its presence means the
//! object supports open-ended membership).

use serde_json::Value;

/// Member name of the vendor metadata block on a schema node.
pub const VENDOR_KEY: &str = "brainvisa";

/// Refinement of a `string` value into a filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    File,
    Directory,
}

impl PathType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "directory" => Some(Self::Directory),
            _ => None,
        }
    }
}

/// Parsed view of a node's vendor metadata block.
///
/// Unknown vendor members are left untouched on the descriptor; this view
/// only extracts the members the engine acts on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub order: Option<i64>,
    pub path_type: Option<PathType>,
    pub class_field: bool,
    pub value_items: Option<Value>,
}

impl Metadata {
    /// Extract the vendor metadata block from a raw schema node.
    pub fn from_node(node: &Value) -> Self {
        match node.get(VENDOR_KEY) {
            Some(block) => Self::from_block(block),
            None => Self::default(),
        }
    }

    /// Parse a vendor metadata block itself.
    pub fn from_block(block: &Value) -> Self {
        let Some(block) = block.as_object() else {
            return Self::default();
        };
        Self {
            order: block.get("order").and_then(Value::as_i64),
            path_type: block
                .get("path_type")
                .and_then(Value::as_str)
                .and_then(PathType::parse),
            class_field: block
                .get("class_field")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            value_items: block.get("value_items").cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_block_yields_defaults() {
        let meta = Metadata::from_node(&json!({"type": "string"}));
        assert_eq!(meta, Metadata::default());
        assert!(!meta.class_field);
    }

    #[test]
    fn parses_known_members() {
        let node = json!({
            "type": "string",
            "brainvisa": {
                "order": 3,
                "path_type": "directory",
                "class_field": true,
            }
        });
        let meta = Metadata::from_node(&node);
        assert_eq!(meta.order, Some(3));
        assert_eq!(meta.path_type, Some(PathType::Directory));
        assert!(meta.class_field);
        assert!(meta.value_items.is_none());
    }

    #[test]
    fn value_items_is_kept_verbatim() {
        let node = json!({
            "type": "object",
            "brainvisa": {"value_items": {"type": "integer"}},
            "properties": {},
        });
        let meta = Metadata::from_node(&node);
        assert_eq!(meta.value_items, Some(json!({"type": "integer"})));
    }

    #[test]
    fn unknown_path_type_is_ignored() {
        let node = json!({"brainvisa": {"path_type": "socket"}});
        assert_eq!(Metadata::from_node(&node).path_type, None);
    }
}
