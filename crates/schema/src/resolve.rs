//! Reference and composition elimination.
//!
//! [`resolve`] turns one raw schema node into a flattened descriptor:
//! `$ref` chains are dereferenced against the root schema document and
//! `allOf` compositions are folded left-to-right. Resolution is shallow
//! (nodes under `items`/`properties` keep their references until a
//! consumer resolves them in turn), deterministic, and never mutates its
//! inputs.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::resolved::ResolvedType;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaReferenceError {
    #[error("unresolved schema reference {reference:?}: missing segment {segment:?}")]
    Missing { reference: String, segment: String },
    #[error("schema reference cycle through {0:?}")]
    Cycle(String),
    #[error("malformed schema reference {0:?}")]
    Malformed(String),
    #[error("schema node is not an object")]
    NotAnObject,
}

/// Resolve one schema node against the root schema document.
///
/// A node with neither `$ref` nor `allOf` resolves to itself.
pub fn resolve(node: &Value, root: &Value) -> Result<ResolvedType, SchemaReferenceError> {
    let mut stack = Vec::new();
    let descriptor = resolve_inner(node, root, &mut stack)?;
    Ok(ResolvedType::from_map(descriptor))
}

fn resolve_inner(
    node: &Value,
    root: &Value,
    stack: &mut Vec<String>,
) -> Result<Map<String, Value>, SchemaReferenceError> {
    let depth = stack.len();
    let mut current = node;
    while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
        if stack.iter().any(|seen| seen == reference) {
            return Err(SchemaReferenceError::Cycle(reference.to_string()));
        }
        stack.push(reference.to_string());
        current = dereference(reference, root)?;
    }
    let object = current
        .as_object()
        .ok_or(SchemaReferenceError::NotAnObject)?;

    let result = match object.get("allOf") {
        Some(all_of) => {
            let members = all_of
                .as_array()
                .ok_or(SchemaReferenceError::NotAnObject)?;
            let mut folded = Map::new();
            for member in members {
                let resolved = resolve_inner(member, root, stack)?;
                merge_descriptor(&mut folded, &resolved);
            }
            // Sibling fields of the composing node win over the composed
            // result; `allOf` itself and `$`-prefixed members are not
            // carried into the descriptor.
            let own: Map<String, Value> = object
                .iter()
                .filter(|(k, _)| k.as_str() != "allOf" && !k.starts_with('$'))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            merge_descriptor(&mut folded, &own);
            folded
        }
        None => object.clone(),
    };
    stack.truncate(depth);
    Ok(result)
}

/// Merge `update` into `target`: scalar members overwrite, `properties`
/// merges key-wise (union of keys, the update wins on conflict).
fn merge_descriptor(target: &mut Map<String, Value>, update: &Map<String, Value>) {
    for (key, value) in update {
        if key == "properties" {
            let merged = target
                .entry("properties")
                .or_insert_with(|| Value::Object(Map::new()));
            if let (Value::Object(into), Value::Object(from)) = (merged, value) {
                for (name, child) in from {
                    into.insert(name.clone(), child.clone());
                }
                continue;
            }
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Walk the root schema document along a local fragment pointer (`#/a/b`).
fn dereference<'a>(reference: &str, root: &'a Value) -> Result<&'a Value, SchemaReferenceError> {
    let Some(fragment) = reference.strip_prefix("#/") else {
        return Err(SchemaReferenceError::Malformed(reference.to_string()));
    };
    let mut current = root;
    for segment in fragment.split('/') {
        current = current
            .get(segment)
            .ok_or_else(|| SchemaReferenceError::Missing {
                reference: reference.to_string(),
                segment: segment.to_string(),
            })?;
    }
    Ok(current)
}
