//! Flattened type descriptors.

use serde_json::{Map, Value};

use crate::metadata::{Metadata, PathType};
use crate::resolve::{resolve, SchemaReferenceError};
use crate::tag;

/// A schema node after `$ref`/`allOf` elimination: a self-contained
/// descriptor with no outstanding references at its own level.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    descriptor: Map<String, Value>,
}

impl ResolvedType {
    pub fn from_map(descriptor: Map<String, Value>) -> Self {
        Self { descriptor }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.descriptor
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.descriptor.clone())
    }

    /// The raw `type` tag. The tag set is open: unknown tags are reported
    /// verbatim so dispatch can stay extensible.
    pub fn type_tag(&self) -> Option<&str> {
        self.descriptor.get("type").and_then(Value::as_str)
    }

    /// The tag after the two refinement layers: `enum` when literal values
    /// are present, `file`/`directory` when string metadata names a path
    /// type, otherwise the raw tag.
    pub fn effective_tag(&self) -> Option<&str> {
        if self.enum_values().is_some() {
            return Some(tag::ENUM);
        }
        if self.type_tag() == Some(tag::STRING) {
            match self.metadata().path_type {
                Some(PathType::File) => return Some(tag::FILE),
                Some(PathType::Directory) => return Some(tag::DIRECTORY),
                None => {}
            }
        }
        self.type_tag()
    }

    /// The ordered literal values of an enumerated type.
    pub fn enum_values(&self) -> Option<&Vec<Value>> {
        self.descriptor.get("enum").and_then(Value::as_array)
    }

    /// The element schema of an array type (unresolved).
    pub fn items(&self) -> Option<&Value> {
        self.descriptor.get("items")
    }

    /// The property map of an object type (unresolved children), in
    /// declaration order.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.descriptor.get("properties").and_then(Value::as_object)
    }

    /// Properties sorted by the vendor `order` metadata, ascending.
    ///
    /// Ties and properties without an order keep declaration order; the
    /// unordered ones sort last. This is a presentation contract only.
    pub fn ordered_properties(&self) -> Vec<(&str, &Value)> {
        let Some(properties) = self.properties() else {
            return Vec::new();
        };
        let mut entries: Vec<(&str, &Value)> = properties
            .iter()
            .map(|(name, node)| (name.as_str(), node))
            .collect();
        entries.sort_by_key(|(_, node)| Metadata::from_node(node).order.unwrap_or(i64::MAX));
        entries
    }

    pub fn metadata(&self) -> Metadata {
        match self.descriptor.get(crate::VENDOR_KEY) {
            Some(block) => Metadata::from_block(block),
            None => Metadata::default(),
        }
    }
}

/// The store-side default value for a freshly allocated member of the
/// given type.
pub fn default_value(
    resolved: &ResolvedType,
    root: &Value,
) -> Result<Value, SchemaReferenceError> {
    let value = match resolved.effective_tag() {
        Some(tag::STRING) | Some(tag::FILE) | Some(tag::DIRECTORY) => Value::String(String::new()),
        Some(tag::INTEGER) => Value::from(0),
        Some(tag::NUMBER) => Value::from(0.0),
        Some(tag::BOOLEAN) => Value::Bool(false),
        Some(tag::ENUM) => resolved
            .enum_values()
            .and_then(|values| values.first().cloned())
            .unwrap_or(Value::Null),
        Some(tag::ARRAY) => Value::Array(Vec::new()),
        Some(tag::OBJECT) => {
            let mut object = Map::new();
            if let Some(properties) = resolved.properties() {
                for (name, node) in properties {
                    let child = resolve(node, root)?;
                    object.insert(name.clone(), default_value(&child, root)?);
                }
            }
            Value::Object(object)
        }
        _ => Value::Null,
    };
    Ok(value)
}
