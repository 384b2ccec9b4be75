//! The widget tree: a headless registry of UI nodes addressed by path.
//!
//! Nodes live in a slab behind [`NodeId`]s. Exactly one *primary* node
//! (a control or a container) may exist per path; ancillary nodes (labels,
//! affordance buttons, the ephemeral name entry) carry the path of the
//! value node they serve but are not indexed. Paths are created by the
//! widget factory and retired by subtree removal, never rewritten.

use indexmap::IndexMap;
use thiserror::Error;

use soma_forms_schema::PathType;

pub type NodeId = usize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("a node already owns path {0:?}")]
    DuplicatePath(String),
}

/// The editable control kind of a leaf node.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Single-line text input.
    Text,
    /// Multi-line text input (homogeneous primitive arrays).
    MultilineText,
    /// Boolean toggle.
    Checkbox,
    /// Closed choice among the listed options.
    Select(Vec<String>),
    /// Path input with a native picker trigger.
    PathInput(PathType),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeRole {
    /// Static text naming a sibling control or container.
    Label,
    /// Editable leaf control.
    Control(Control),
    /// Structured node owning children.
    Container,
    /// "Append element" affordance of an array container.
    AddItem,
    /// "Clear all elements" affordance of an array container.
    ClearItems,
    /// "Add named member" affordance of an open-membership object.
    AddNamedItem,
    /// "Remove this member/element" affordance.
    RemoveItem,
    /// Ephemeral name-entry control shown while a container is naming.
    NameEntry,
}

impl NodeRole {
    /// Primary nodes own their path in the tree index.
    pub fn is_primary(&self) -> bool {
        matches!(self, NodeRole::Control(_) | NodeRole::Container)
    }
}

/// Container mutation state: `Naming` while the ephemeral name-entry
/// control is shown, `Stable` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerState {
    #[default]
    Stable,
    Naming,
}

#[derive(Debug, Clone)]
pub struct UiNode {
    /// Serialized path of the value node this UI node serves.
    pub path: String,
    /// Resolved type tag driving synchronization ("integer",
    /// "list_integer", "object", ...).
    pub controller_type: String,
    pub role: NodeRole,
    /// Label text for labels, raw display value for controls.
    pub text: String,
    /// Set when the last synchronization attempt for this path failed.
    pub error: bool,
    pub state: ContainerState,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl UiNode {
    pub fn new(path: impl Into<String>, controller_type: impl Into<String>, role: NodeRole) -> Self {
        Self {
            path: path.into(),
            controller_type: controller_type.into(),
            role,
            text: String::new(),
            error: false,
            state: ContainerState::default(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

#[derive(Debug, Default)]
pub struct FormTree {
    nodes: Vec<Option<UiNode>>,
    index: IndexMap<String, NodeId>,
    roots: Vec<NodeId>,
}

impl FormTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Primary nodes claim their path; claiming an already
    /// owned path is an error (path uniqueness invariant).
    pub fn insert(&mut self, node: UiNode) -> Result<NodeId, TreeError> {
        if node.role.is_primary() && self.index.contains_key(&node.path) {
            return Err(TreeError::DuplicatePath(node.path.clone()));
        }
        let id = self.nodes.len();
        if node.role.is_primary() {
            self.index.insert(node.path.clone(), id);
        }
        self.nodes.push(Some(node));
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&UiNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut UiNode> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// The primary node owning a serialized path.
    pub fn node_at(&self, path: &str) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn set_roots(&mut self, roots: Vec<NodeId>) {
        self.roots = roots;
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `child` to `parent`'s children and record the back link.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Insert `child` under `parent` at `position`.
    pub fn insert_child_at(&mut self, parent: NodeId, position: usize, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            let position = position.min(node.children.len());
            node.children.insert(position, child);
        }
    }

    /// Position of the first affordance child of `parent`, i.e. where new
    /// value children should be inserted to stay ahead of the buttons.
    pub fn first_affordance_position(&self, parent: NodeId) -> usize {
        let Some(node) = self.get(parent) else {
            return 0;
        };
        for (position, child) in node.children.iter().enumerate() {
            if let Some(child) = self.get(*child) {
                if matches!(
                    child.role,
                    NodeRole::AddItem
                        | NodeRole::ClearItems
                        | NodeRole::AddNamedItem
                        | NodeRole::NameEntry
                ) {
                    return position;
                }
            }
        }
        node.children.len()
    }

    /// Child of `parent` matching a predicate.
    pub fn find_child(
        &self,
        parent: NodeId,
        predicate: impl Fn(&UiNode) -> bool,
    ) -> Option<NodeId> {
        self.get(parent)?
            .children
            .iter()
            .copied()
            .find(|id| self.get(*id).map(&predicate).unwrap_or(false))
    }

    pub fn set_error(&mut self, id: NodeId, error: bool) {
        if let Some(node) = self.get_mut(id) {
            node.error = error;
        }
    }

    /// Remove one node (and its back link from the parent). Used for
    /// ephemeral nodes; value subtrees go through [`Self::remove_subtree`].
    pub fn remove_node(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id).and_then(|slot| slot.take()) {
            if node.role.is_primary() {
                self.index.shift_remove(&node.path);
            }
            if let Some(parent) = node.parent {
                if let Some(parent) = self.get_mut(parent) {
                    parent.children.retain(|child| *child != id);
                }
            }
            for child in node.children {
                self.remove_detached(child);
            }
        }
    }

    /// Remove the primary node at `path`, its whole subtree, and every
    /// ancillary sibling (label, affordances) serving the same path. The
    /// removed paths are retired from the index.
    pub fn remove_subtree(&mut self, path: &str) -> bool {
        let Some(id) = self.node_at(path) else {
            return false;
        };
        let parent = self.get(id).and_then(|node| node.parent);
        let mut doomed = vec![id];
        if let Some(parent) = parent {
            if let Some(parent_node) = self.get(parent) {
                for sibling in &parent_node.children {
                    if *sibling != id {
                        if let Some(node) = self.get(*sibling) {
                            if node.path == path && !node.role.is_primary() {
                                doomed.push(*sibling);
                            }
                        }
                    }
                }
            }
        }
        for id in doomed {
            if let Some(parent) = parent {
                if let Some(parent_node) = self.get_mut(parent) {
                    parent_node.children.retain(|child| *child != id);
                }
            }
            self.remove_detached(id);
        }
        let nodes = &self.nodes;
        self.roots
            .retain(|root| nodes.get(*root).map(Option::is_some).unwrap_or(false));
        true
    }

    fn remove_detached(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id).and_then(|slot| slot.take()) {
            if node.role.is_primary() {
                self.index.shift_remove(&node.path);
            }
            for child in node.children {
                self.remove_detached(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(path: &str, tag: &str) -> UiNode {
        UiNode::new(path, tag, NodeRole::Control(Control::Text))
    }

    #[test]
    fn primary_paths_are_unique() {
        let mut tree = FormTree::new();
        tree.insert(control("n", "integer")).unwrap();
        let err = tree.insert(control("n", "integer")).unwrap_err();
        assert_eq!(err, TreeError::DuplicatePath("n".to_string()));
        // Ancillary nodes may share the path freely.
        tree.insert(UiNode::new("n", "integer", NodeRole::Label))
            .unwrap();
    }

    #[test]
    fn node_lookup_by_path() {
        let mut tree = FormTree::new();
        let id = tree.insert(control("a/0", "string")).unwrap();
        assert_eq!(tree.node_at("a/0"), Some(id));
        assert_eq!(tree.node_at("a/1"), None);
    }

    #[test]
    fn remove_subtree_retires_paths_and_siblings() {
        let mut tree = FormTree::new();
        let container = tree
            .insert(UiNode::new("", "object", NodeRole::Container))
            .unwrap();
        let label = tree
            .insert(UiNode::new("n", "integer", NodeRole::Label).with_text("n"))
            .unwrap();
        let leaf = tree.insert(control("n", "integer")).unwrap();
        let remove = tree
            .insert(UiNode::new("n", "integer", NodeRole::RemoveItem))
            .unwrap();
        for id in [label, leaf, remove] {
            tree.add_child(container, id);
        }
        assert!(tree.remove_subtree("n"));
        assert_eq!(tree.node_at("n"), None);
        assert!(tree.get(label).is_none());
        assert!(tree.get(leaf).is_none());
        assert!(tree.get(remove).is_none());
        assert_eq!(tree.get(container).unwrap().children.len(), 0);
        assert!(!tree.remove_subtree("n"));
    }

    #[test]
    fn remove_subtree_recurses_into_children() {
        let mut tree = FormTree::new();
        let outer = tree
            .insert(UiNode::new("lo", "array", NodeRole::Container))
            .unwrap();
        let inner = tree
            .insert(UiNode::new("lo/0", "object", NodeRole::Container))
            .unwrap();
        let leaf = tree.insert(control("lo/0/s", "string")).unwrap();
        tree.add_child(outer, inner);
        tree.add_child(inner, leaf);
        assert!(tree.remove_subtree("lo/0"));
        assert_eq!(tree.node_at("lo/0"), None);
        assert_eq!(tree.node_at("lo/0/s"), None);
        assert_eq!(tree.node_at("lo"), Some(outer));
    }

    #[test]
    fn first_affordance_position_targets_button_row() {
        let mut tree = FormTree::new();
        let container = tree
            .insert(UiNode::new("li", "array", NodeRole::Container))
            .unwrap();
        let leaf = tree.insert(control("li/0", "integer")).unwrap();
        let add = tree
            .insert(UiNode::new("li", "array", NodeRole::AddItem))
            .unwrap();
        tree.add_child(container, leaf);
        tree.add_child(container, add);
        assert_eq!(tree.first_affordance_position(container), 1);
    }
}
