//! Structural mutations: the operations that change the shape of the
//! value tree and the transient UI states they require.
//!
//! Arrays grow through "allocate next index" and shrink through clears and
//! removals; open-membership objects gain members through a naming state
//! machine (stable → naming → stable) with an ephemeral name-entry
//! control. Every operation applies its tree change only after the store
//! confirmed the mutation; a rejected call leaves the tree untouched.

use serde_json::Value;

use soma_forms_path::{child_path, format_path, Path};
use soma_forms_schema::{tag, ResolvedType};

use crate::error::FormError;
use crate::factory::WidgetFactory;
use crate::transport::Transport;
use crate::tree::{ContainerState, FormTree, NodeId, NodeRole, UiNode};

/// Generator for placeholder member names, scoped to one protocol
/// instance so independent engines never collide.
#[derive(Debug, Default)]
pub struct NameGenerator {
    next: u64,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placeholder(&mut self) -> String {
        self.next += 1;
        format!("new_item_{}", self.next)
    }
}

#[derive(Debug, Default)]
pub struct MutationProtocol {
    names: NameGenerator,
}

impl MutationProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one element to the array container at `container`.
    ///
    /// The store allocates the index and the new element's value; the
    /// subtree is then built from the container's `items` type. Returns
    /// the allocated index, or `None` when the store declined.
    pub fn append_item<T: Transport>(
        &mut self,
        tree: &mut FormTree,
        factory: &WidgetFactory,
        transport: &mut T,
        container: &[String],
    ) -> Result<Option<usize>, FormError> {
        let container_id = self.container_id(tree, container, tag::ARRAY)?;
        let Some(index) = transport.new_list_item(container)? else {
            return Ok(None);
        };
        let key = index.to_string();
        let child = child_path(container, &key);
        let value = transport.get_value(&child)?;
        let descriptor = transport.get_type(container)?;
        let resolved = factory.resolve_node(&descriptor)?;
        let items = resolved.items().ok_or_else(|| FormError::NotAContainer {
            path: format_path(container),
            expected: "array",
        })?;
        let element = factory.resolve_node(items)?;
        let label = format!("[{index}]");
        let ids = factory.build(tree, &child, Some(&label), &element, &value)?;
        self.attach_member(tree, container_id, &child, &element, ids)?;
        log::debug!(
            "appended element {index} to {:?}",
            format_path(container)
        );
        Ok(Some(index))
    }

    /// Clear the array container at `container` by storing an empty
    /// sequence, then rebuild its children from the authoritative result.
    pub fn clear_items<T: Transport>(
        &mut self,
        tree: &mut FormTree,
        factory: &WidgetFactory,
        transport: &mut T,
        container: &[String],
    ) -> Result<(), FormError> {
        let container_id = self.container_id(tree, container, tag::ARRAY)?;
        let stored = match transport.set_value(container, Value::Array(Vec::new())) {
            Ok(stored) => {
                tree.set_error(container_id, false);
                stored
            }
            Err(error) => {
                tree.set_error(container_id, true);
                return Err(error.into());
            }
        };
        // Rebuild from the post-update value: drop every element subtree,
        // then re-create whatever the store reports (normally nothing).
        let element_paths: Vec<String> = self
            .member_paths(tree, container_id, container)
            .collect();
        for path in element_paths {
            tree.remove_subtree(&path);
        }
        if let Some(elements) = stored.as_array() {
            if !elements.is_empty() {
                let descriptor = transport.get_type(container)?;
                let resolved = factory.resolve_node(&descriptor)?;
                if let Some(items) = resolved.items() {
                    let element = factory.resolve_node(items)?;
                    for (index, value) in elements.iter().enumerate() {
                        let key = index.to_string();
                        let child = child_path(container, &key);
                        let label = format!("[{index}]");
                        let ids = factory.build(tree, &child, Some(&label), &element, value)?;
                        self.attach_member(tree, container_id, &child, &element, ids)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Transition an open-membership object container to the naming state
    /// and attach the ephemeral name-entry control, pre-filled with a
    /// placeholder. Idempotent while already naming.
    pub fn begin_naming(
        &mut self,
        tree: &mut FormTree,
        container: &[String],
    ) -> Result<NodeId, FormError> {
        let container_id = self.container_id(tree, container, tag::OBJECT)?;
        if tree
            .find_child(container_id, |node| node.role == NodeRole::AddNamedItem)
            .is_none()
        {
            return Err(FormError::NotAContainer {
                path: format_path(container),
                expected: "open-membership object",
            });
        }
        if let Some(entry) = self.name_entry(tree, container_id) {
            return Ok(entry);
        }
        let placeholder = self.names.placeholder();
        let serialized = format_path(container);
        let entry = tree.insert(
            UiNode::new(&serialized, tag::OBJECT, NodeRole::NameEntry).with_text(placeholder),
        )?;
        tree.add_child(container_id, entry);
        if let Some(node) = tree.get_mut(container_id) {
            node.state = ContainerState::Naming;
        }
        Ok(entry)
    }

    /// Replace the candidate name typed into the ephemeral control.
    pub fn set_candidate_name(
        &mut self,
        tree: &mut FormTree,
        container: &[String],
        candidate: &str,
    ) -> Result<(), FormError> {
        let container_id = self.container_id(tree, container, tag::OBJECT)?;
        let entry = self
            .name_entry(tree, container_id)
            .ok_or_else(|| FormError::UnknownPath(format_path(container)))?;
        if let Some(node) = tree.get_mut(entry) {
            node.text = candidate.to_string();
        }
        Ok(())
    }

    /// Commit the naming state: register the candidate with the store and
    /// build the new member's subtree under the key the store actually
    /// assigned (which may differ from the candidate). The ephemeral
    /// control is removed on every exit; on rejection or failure the value
    /// tree stays untouched.
    pub fn commit_naming<T: Transport>(
        &mut self,
        tree: &mut FormTree,
        factory: &WidgetFactory,
        transport: &mut T,
        container: &[String],
    ) -> Result<Option<String>, FormError> {
        let container_id = self.container_id(tree, container, tag::OBJECT)?;
        let entry = self
            .name_entry(tree, container_id)
            .ok_or_else(|| FormError::UnknownPath(format_path(container)))?;
        let candidate = tree.get(entry).map(|node| node.text.clone()).unwrap_or_default();
        let result = transport.new_named_item(container, &candidate);
        self.leave_naming(tree, container_id, entry);
        let key = match result? {
            Some(key) => key,
            None => return Ok(None),
        };
        // Membership changed, so the container's descriptor must be
        // re-fetched before the member type can be read.
        let descriptor = transport.get_type(container)?;
        let resolved = factory.resolve_node(&descriptor)?;
        let item_schema = resolved
            .metadata()
            .value_items
            .ok_or_else(|| FormError::NotAContainer {
                path: format_path(container),
                expected: "open-membership object",
            })?;
        let member = factory.resolve_node(&item_schema)?;
        let child = child_path(container, &key);
        let value = transport.get_value(&child)?;
        let ids = factory.build(tree, &child, Some(&key), &member, &value)?;
        self.attach_member(tree, container_id, &child, &member, ids)?;
        log::debug!(
            "registered member {key:?} on {:?} (candidate {candidate:?})",
            format_path(container)
        );
        Ok(Some(key))
    }

    /// Cancel the naming state with no remote call.
    pub fn cancel_naming(
        &mut self,
        tree: &mut FormTree,
        container: &[String],
    ) -> Result<(), FormError> {
        let container_id = self.container_id(tree, container, tag::OBJECT)?;
        if let Some(entry) = self.name_entry(tree, container_id) {
            self.leave_naming(tree, container_id, entry);
        }
        Ok(())
    }

    /// Remove the member or element at `path`. On a confirmed removal the
    /// label, control, affordances and any container subtree disappear
    /// from the tree; otherwise the tree is untouched.
    pub fn remove_member<T: Transport>(
        &mut self,
        tree: &mut FormTree,
        transport: &mut T,
        path: &[String],
    ) -> Result<bool, FormError> {
        let removed = transport.remove_item(path)?;
        if removed {
            tree.remove_subtree(&format_path(path));
            log::debug!("removed member at {:?}", format_path(path));
        }
        Ok(removed)
    }

    fn container_id(
        &self,
        tree: &FormTree,
        container: &[String],
        expected: &'static str,
    ) -> Result<NodeId, FormError> {
        let serialized = format_path(container);
        let id = tree
            .node_at(&serialized)
            .ok_or_else(|| FormError::UnknownPath(serialized.clone()))?;
        let node = tree
            .get(id)
            .ok_or_else(|| FormError::UnknownPath(serialized.clone()))?;
        if node.role != NodeRole::Container || node.controller_type != expected {
            return Err(FormError::NotAContainer {
                path: serialized,
                expected,
            });
        }
        Ok(id)
    }

    fn name_entry(&self, tree: &FormTree, container_id: NodeId) -> Option<NodeId> {
        tree.find_child(container_id, |node| node.role == NodeRole::NameEntry)
    }

    fn leave_naming(&self, tree: &mut FormTree, container_id: NodeId, entry: NodeId) {
        tree.remove_node(entry);
        if let Some(node) = tree.get_mut(container_id) {
            node.state = ContainerState::Stable;
        }
    }

    /// Attach a freshly built member (its nodes plus a remove affordance)
    /// ahead of the container's affordance row.
    fn attach_member(
        &self,
        tree: &mut FormTree,
        container_id: NodeId,
        child: &Path,
        element: &ResolvedType,
        ids: Vec<NodeId>,
    ) -> Result<(), FormError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut position = tree.first_affordance_position(container_id);
        for id in ids {
            tree.insert_child_at(container_id, position, id);
            position += 1;
        }
        let remove = tree.insert(UiNode::new(
            format_path(child),
            element.effective_tag().unwrap_or_default(),
            NodeRole::RemoveItem,
        ))?;
        tree.insert_child_at(container_id, position, remove);
        Ok(())
    }

    /// Serialized paths of the container's current member subtrees.
    fn member_paths<'a>(
        &self,
        tree: &'a FormTree,
        container_id: NodeId,
        container: &[String],
    ) -> impl Iterator<Item = String> + 'a {
        let own = format_path(container);
        let children = tree
            .get(container_id)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        children
            .into_iter()
            .filter_map(move |id| tree.get(id))
            .filter(move |node| node.role.is_primary() && node.path != own)
            .map(|node| node.path.clone())
    }
}
