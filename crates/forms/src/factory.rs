//! Widget factory: recursive construction of the UI tree.
//!
//! A (path, resolved type, current value) triple becomes a list of root
//! nodes for the field: a label plus a control for labeled leaves, a
//! single container for labeled structures, a bare container for the
//! anonymous top-level tree. Dispatch runs on the resolved type tag
//! through an open registry; two override layers run first: string
//! metadata refining into file/directory (and `enum` literals into a
//! closed choice), and array element specializations (homogeneous
//! primitive arrays become one multi-line control). A tag with no builder
//! yields no nodes at all: malformed or forward-incompatible schema
//! fragments degrade silently instead of failing the whole build.

use std::collections::HashMap;

use serde_json::Value;

use soma_forms_path::{child_path, format_path};
use soma_forms_schema::{resolve, tag, Metadata, PathType, ResolvedType};

use crate::coerce::display;
use crate::error::FormError;
use crate::tree::{Control, FormTree, NodeId, NodeRole, UiNode};

/// Controller types of the homogeneous-array specializations.
pub const LIST_STRING: &str = "list_string";
pub const LIST_INTEGER: &str = "list_integer";
pub const LIST_NUMBER: &str = "list_number";

/// Inputs handed to a builder.
pub struct BuildContext<'a> {
    pub path: &'a [String],
    pub label: Option<&'a str>,
    pub resolved: &'a ResolvedType,
    pub value: &'a Value,
}

pub type BuilderFn =
    fn(&WidgetFactory, &mut FormTree, &BuildContext) -> Result<Vec<NodeId>, FormError>;

/// Open mapping from type tag to builder, populated at startup.
///
/// New leaf builders and array specializations register without touching
/// the generic fallbacks.
pub struct WidgetRegistry {
    builders: HashMap<String, BuilderFn>,
    array_builders: HashMap<String, BuilderFn>,
}

impl WidgetRegistry {
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
            array_builders: HashMap::new(),
        }
    }

    /// The standard widget set.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(tag::STRING, build_string);
        registry.register(tag::INTEGER, build_integer);
        registry.register(tag::NUMBER, build_number);
        registry.register(tag::BOOLEAN, build_boolean);
        registry.register(tag::ENUM, build_enum);
        registry.register(tag::FILE, build_file);
        registry.register(tag::DIRECTORY, build_directory);
        registry.register(tag::OBJECT, build_object);
        registry.register(tag::ARRAY, build_array);
        registry.register_array(tag::STRING, build_list_string);
        registry.register_array(tag::INTEGER, build_list_integer);
        registry.register_array(tag::NUMBER, build_list_number);
        registry
    }

    pub fn register(&mut self, tag: &str, builder: BuilderFn) {
        self.builders.insert(tag.to_string(), builder);
    }

    /// Register a builder for whole arrays of the given element tag.
    pub fn register_array(&mut self, element_tag: &str, builder: BuilderFn) {
        self.array_builders.insert(element_tag.to_string(), builder);
    }

    pub fn builder(&self, tag: &str) -> Option<BuilderFn> {
        self.builders.get(tag).copied()
    }

    pub fn array_builder(&self, element_tag: &str) -> Option<BuilderFn> {
        self.array_builders.get(element_tag).copied()
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

pub struct WidgetFactory {
    registry: WidgetRegistry,
    root_schema: Value,
}

impl WidgetFactory {
    pub fn new(root_schema: Value) -> Self {
        Self::with_registry(root_schema, WidgetRegistry::standard())
    }

    pub fn with_registry(root_schema: Value, registry: WidgetRegistry) -> Self {
        Self {
            registry,
            root_schema,
        }
    }

    pub fn root_schema(&self) -> &Value {
        &self.root_schema
    }

    /// Resolve a raw schema node against this factory's root document.
    pub fn resolve_node(&self, node: &Value) -> Result<ResolvedType, FormError> {
        Ok(resolve(node, &self.root_schema)?)
    }

    /// Build the widget subtree for one field.
    pub fn build(
        &self,
        tree: &mut FormTree,
        path: &[String],
        label: Option<&str>,
        resolved: &ResolvedType,
        value: &Value,
    ) -> Result<Vec<NodeId>, FormError> {
        let Some(effective) = resolved.effective_tag() else {
            log::debug!("untyped schema fragment at {:?} omitted", format_path(path));
            return Ok(Vec::new());
        };
        let builder = if effective == tag::ARRAY {
            let specialized = match resolved.items() {
                Some(items) => self
                    .resolve_node(items)?
                    .effective_tag()
                    .and_then(|element| self.registry.array_builder(element)),
                None => None,
            };
            specialized.or_else(|| self.registry.builder(effective))
        } else {
            self.registry.builder(effective)
        };
        match builder {
            Some(builder) => {
                let context = BuildContext {
                    path,
                    label,
                    resolved,
                    value,
                };
                builder(self, tree, &context)
            }
            None => {
                log::debug!(
                    "no widget builder for type tag {:?}; field at {:?} omitted",
                    effective,
                    format_path(path)
                );
                Ok(Vec::new())
            }
        }
    }
}

// ── Leaf builders ─────────────────────────────────────────────────────────

fn labeled_leaf(
    tree: &mut FormTree,
    context: &BuildContext,
    controller_type: &str,
    control: Control,
) -> Result<Vec<NodeId>, FormError> {
    let serialized = format_path(context.path);
    let mut out = Vec::new();
    if let Some(label) = context.label {
        let id = tree.insert(
            UiNode::new(&serialized, controller_type, NodeRole::Label).with_text(label),
        )?;
        out.push(id);
    }
    let text = display(controller_type, context.value);
    let id = tree.insert(
        UiNode::new(&serialized, controller_type, NodeRole::Control(control)).with_text(text),
    )?;
    out.push(id);
    Ok(out)
}

pub fn build_string(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(tree, context, tag::STRING, Control::Text)
}

pub fn build_integer(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(tree, context, tag::INTEGER, Control::Text)
}

pub fn build_number(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(tree, context, tag::NUMBER, Control::Text)
}

pub fn build_boolean(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(tree, context, tag::BOOLEAN, Control::Checkbox)
}

pub fn build_enum(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    let options = context
        .resolved
        .enum_values()
        .map(|values| {
            values
                .iter()
                .map(|value| match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    labeled_leaf(tree, context, tag::ENUM, Control::Select(options))
}

pub fn build_file(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(tree, context, tag::FILE, Control::PathInput(PathType::File))
}

pub fn build_directory(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(
        tree,
        context,
        tag::DIRECTORY,
        Control::PathInput(PathType::Directory),
    )
}

// ── Homogeneous-array specializations ─────────────────────────────────────

pub fn build_list_string(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(tree, context, LIST_STRING, Control::MultilineText)
}

pub fn build_list_integer(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(tree, context, LIST_INTEGER, Control::MultilineText)
}

pub fn build_list_number(
    _factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    labeled_leaf(tree, context, LIST_NUMBER, Control::MultilineText)
}

// ── Structure builders ────────────────────────────────────────────────────

pub fn build_object(
    factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    let serialized = format_path(context.path);
    let metadata = context.resolved.metadata();
    let container = tree.insert(
        UiNode::new(&serialized, tag::OBJECT, NodeRole::Container)
            .with_text(context.label.unwrap_or_default()),
    )?;

    for (name, node) in context.resolved.ordered_properties() {
        let child_metadata = Metadata::from_node(node);
        let resolved_child = factory.resolve_node(node)?;
        let removable = !child_metadata.class_field;
        build_member(
            factory,
            tree,
            container,
            context,
            name,
            &resolved_child,
            removable,
        )?;
    }

    // Members registered at runtime on an open-membership object are part
    // of the value but not of the declared properties.
    if let Some(item_schema) = &metadata.value_items {
        let declared = context.resolved.properties();
        if let Some(members) = context.value.as_object() {
            let resolved_member = factory.resolve_node(item_schema)?;
            for name in members.keys() {
                if declared.map(|map| map.contains_key(name)).unwrap_or(false) {
                    continue;
                }
                build_member(factory, tree, container, context, name, &resolved_member, true)?;
            }
        }
        let add = tree.insert(UiNode::new(&serialized, tag::OBJECT, NodeRole::AddNamedItem))?;
        tree.add_child(container, add);
    }
    Ok(vec![container])
}

fn build_member(
    factory: &WidgetFactory,
    tree: &mut FormTree,
    container: NodeId,
    context: &BuildContext,
    name: &str,
    resolved_child: &ResolvedType,
    removable: bool,
) -> Result<(), FormError> {
    let child = child_path(context.path, name);
    let child_value = context.value.get(name).cloned().unwrap_or(Value::Null);
    let ids = factory.build(tree, &child, Some(name), resolved_child, &child_value)?;
    if ids.is_empty() {
        return Ok(());
    }
    for id in ids {
        tree.add_child(container, id);
    }
    if removable {
        let remove = tree.insert(UiNode::new(
            format_path(&child),
            resolved_child.effective_tag().unwrap_or_default(),
            NodeRole::RemoveItem,
        ))?;
        tree.add_child(container, remove);
    }
    Ok(())
}

pub fn build_array(
    factory: &WidgetFactory,
    tree: &mut FormTree,
    context: &BuildContext,
) -> Result<Vec<NodeId>, FormError> {
    let serialized = format_path(context.path);
    let container = tree.insert(
        UiNode::new(&serialized, tag::ARRAY, NodeRole::Container)
            .with_text(context.label.unwrap_or_default()),
    )?;
    if let Some(items) = context.resolved.items() {
        let element = factory.resolve_node(items)?;
        if let Some(values) = context.value.as_array() {
            for (index, element_value) in values.iter().enumerate() {
                let key = index.to_string();
                let child = child_path(context.path, &key);
                let label = format!("[{index}]");
                let ids = factory.build(tree, &child, Some(&label), &element, element_value)?;
                if ids.is_empty() {
                    continue;
                }
                for id in ids {
                    tree.add_child(container, id);
                }
                let remove = tree.insert(UiNode::new(
                    format_path(&child),
                    element.effective_tag().unwrap_or_default(),
                    NodeRole::RemoveItem,
                ))?;
                tree.add_child(container, remove);
            }
        }
    }
    let add = tree.insert(UiNode::new(&serialized, tag::ARRAY, NodeRole::AddItem))?;
    tree.add_child(container, add);
    let clear = tree.insert(UiNode::new(&serialized, tag::ARRAY, NodeRole::ClearItems))?;
    tree.add_child(container, clear);
    Ok(vec![container])
}
