//! Top-level assembly: one form bound to one transport.

use soma_forms_path::parse_path;
use soma_forms_schema::{resolve, PathType};

use crate::coerce::RawInput;
use crate::error::FormError;
use crate::factory::WidgetFactory;
use crate::mutation::MutationProtocol;
use crate::sync::{on_local_change, on_remote_value};
use crate::transport::Transport;
use crate::tree::{Control, FormTree, NodeRole};

/// An editable form mirroring the remote store behind `transport`.
///
/// Opening a session fetches the schema and the root value and builds the
/// anonymous top-level tree; all later interaction goes through the
/// path-addressed methods, which accept serialized paths.
pub struct FormSession<T: Transport> {
    transport: T,
    tree: FormTree,
    factory: WidgetFactory,
    mutations: MutationProtocol,
}

impl<T: Transport> FormSession<T> {
    /// Open the transport's default schema.
    pub fn open(transport: T) -> Result<Self, FormError> {
        Self::open_schema(transport, None)
    }

    /// Open a named schema document.
    pub fn open_schema(mut transport: T, name: Option<&str>) -> Result<Self, FormError> {
        let schema = transport.get_schema(name)?;
        let value = transport.get_value(&[])?;
        let factory = WidgetFactory::new(schema.clone());
        let resolved = resolve(&schema, &schema)?;
        let mut tree = FormTree::new();
        let roots = factory.build(&mut tree, &[], None, &resolved, &value)?;
        tree.set_roots(roots);
        Ok(Self {
            transport,
            tree,
            factory,
            mutations: MutationProtocol::new(),
        })
    }

    pub fn tree(&self) -> &FormTree {
        &self.tree
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Submit raw input for the control at `path`.
    pub fn edit(&mut self, path: &str, raw: RawInput) -> Result<(), FormError> {
        let path = parse_path(path)?;
        on_local_change(&mut self.tree, &mut self.transport, &path, &raw)
    }

    /// Re-fetch the value at `path` and refresh the subtree's display.
    pub fn refresh(&mut self, path: &str) -> Result<(), FormError> {
        let path = parse_path(path)?;
        let value = self.transport.get_value(&path)?;
        on_remote_value(&mut self.tree, &path, &value);
        Ok(())
    }

    /// Append an element to the array container at `path`.
    pub fn append_item(&mut self, path: &str) -> Result<Option<usize>, FormError> {
        let path = parse_path(path)?;
        self.mutations
            .append_item(&mut self.tree, &self.factory, &mut self.transport, &path)
    }

    /// Clear the array container at `path` and rebuild it from the
    /// authoritative result.
    pub fn clear_items(&mut self, path: &str) -> Result<(), FormError> {
        let path = parse_path(path)?;
        self.mutations
            .clear_items(&mut self.tree, &self.factory, &mut self.transport, &path)
    }

    /// Start naming a new member on the open-membership object at `path`.
    pub fn begin_naming(&mut self, path: &str) -> Result<(), FormError> {
        let path = parse_path(path)?;
        self.mutations.begin_naming(&mut self.tree, &path)?;
        Ok(())
    }

    /// Replace the candidate name in the ephemeral entry control.
    pub fn set_candidate_name(&mut self, path: &str, candidate: &str) -> Result<(), FormError> {
        let path = parse_path(path)?;
        self.mutations
            .set_candidate_name(&mut self.tree, &path, candidate)
    }

    /// Commit the naming state; returns the key the store assigned.
    pub fn commit_naming(&mut self, path: &str) -> Result<Option<String>, FormError> {
        let path = parse_path(path)?;
        self.mutations
            .commit_naming(&mut self.tree, &self.factory, &mut self.transport, &path)
    }

    /// Cancel the naming state with no remote call.
    pub fn cancel_naming(&mut self, path: &str) -> Result<(), FormError> {
        let path = parse_path(path)?;
        self.mutations.cancel_naming(&mut self.tree, &path)
    }

    /// Remove the member or element at `path`.
    pub fn remove_member(&mut self, path: &str) -> Result<bool, FormError> {
        let path = parse_path(path)?;
        self.mutations
            .remove_member(&mut self.tree, &mut self.transport, &path)
    }

    /// Route the native picker into the path control at `path` and sync
    /// the selected value. Returns `false` when the picker yielded
    /// nothing (cancelled, or no native surface).
    pub fn pick_path(&mut self, path: &str) -> Result<bool, FormError> {
        let segments = parse_path(path)?;
        let serialized = soma_forms_path::format_path(&segments);
        let id = self
            .tree
            .node_at(&serialized)
            .ok_or_else(|| FormError::UnknownPath(serialized.clone()))?;
        let kind = match self.tree.get(id).map(|node| &node.role) {
            Some(NodeRole::Control(Control::PathInput(kind))) => *kind,
            _ => {
                return Err(FormError::UnknownPath(path.to_string()));
            }
        };
        let selected = match kind {
            PathType::File => self.transport.file_selector()?,
            PathType::Directory => self.transport.directory_selector()?,
        };
        match selected {
            Some(selected) => {
                on_local_change(
                    &mut self.tree,
                    &mut self.transport,
                    &segments,
                    &RawInput::Text(selected),
                )?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
