//! In-memory reference transport.
//!
//! Owns a root schema document and a JSON value tree and answers the full
//! [`Transport`] surface against them: path-addressed reads and writes
//! with type-shape checks, element allocation with schema defaults,
//! named-member registration with key deduplication, and resolved type
//! lookup along a path. Useful as the in-process store behind a form and
//! as the workhorse of the engine's tests.

use std::collections::HashSet;

use serde_json::Value;

use soma_forms_path::{find, find_mut, format_path, split_last};
use soma_forms_schema::{default_value, resolve, tag, ResolvedType, SchemaReferenceError};

use crate::transport::{Transport, TransportError};

pub struct MemoryTransport {
    schema: Value,
    value: Value,
    poisoned: HashSet<String>,
}

impl MemoryTransport {
    pub fn new(schema: Value, value: Value) -> Self {
        Self {
            schema,
            value,
            poisoned: HashSet::new(),
        }
    }

    /// The current authoritative value tree.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Fault injection for tests: subsequent `set_value` calls on this
    /// serialized path are rejected.
    pub fn poison_path(&mut self, path: &str) {
        self.poisoned.insert(path.to_string());
    }

    pub fn heal_path(&mut self, path: &str) {
        self.poisoned.remove(path);
    }

    fn rejected(path: &[String], message: impl Into<String>) -> TransportError {
        TransportError::Rejected {
            path: format_path(path),
            message: message.into(),
        }
    }

    fn schema_error(path: &[String], error: SchemaReferenceError) -> TransportError {
        Self::rejected(path, error.to_string())
    }

    /// Resolve the type descriptor for the value at `path` by descending
    /// the schema: object properties by name (falling back to the member
    /// type of open-membership objects), array items by index.
    fn type_at(&self, path: &[String]) -> Result<ResolvedType, TransportError> {
        let mut current =
            resolve(&self.schema, &self.schema).map_err(|e| Self::schema_error(path, e))?;
        for segment in path {
            let child = match current.type_tag() {
                Some(tag::OBJECT) => {
                    let declared = current
                        .properties()
                        .and_then(|properties| properties.get(segment))
                        .cloned();
                    match declared.or_else(|| current.metadata().value_items) {
                        Some(child) => child,
                        None => {
                            return Err(Self::rejected(
                                path,
                                format!("no type for member {segment:?}"),
                            ))
                        }
                    }
                }
                Some(tag::ARRAY) => match current.items() {
                    Some(items) => items.clone(),
                    None => {
                        return Err(Self::rejected(path, "array type without an item type"))
                    }
                },
                other => {
                    return Err(Self::rejected(
                        path,
                        format!("cannot descend into type {other:?}"),
                    ))
                }
            };
            current = resolve(&child, &self.schema).map_err(|e| Self::schema_error(path, e))?;
        }
        Ok(current)
    }

    /// Type-shape check: the stored value's JSON kind must match the
    /// resolved tag. No constraint validation beyond that.
    fn check_shape(
        &self,
        path: &[String],
        resolved: &ResolvedType,
        value: &Value,
    ) -> Result<(), TransportError> {
        let ok = match resolved.effective_tag() {
            Some(tag::STRING) | Some(tag::ENUM) | Some(tag::FILE) | Some(tag::DIRECTORY) => {
                value.is_string()
            }
            Some(tag::INTEGER) => value.is_i64() || value.is_u64(),
            Some(tag::NUMBER) => value.is_number(),
            Some(tag::BOOLEAN) => value.is_boolean(),
            Some(tag::OBJECT) => value.is_object(),
            Some(tag::ARRAY) => match value.as_array() {
                Some(elements) => {
                    if let Some(items) = resolved.items() {
                        let element_type = resolve(items, &self.schema)
                            .map_err(|e| Self::schema_error(path, e))?;
                        for element in elements {
                            self.check_shape(path, &element_type, element)?;
                        }
                    }
                    true
                }
                None => false,
            },
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Self::rejected(
                path,
                format!(
                    "value kind does not match type {:?}",
                    resolved.effective_tag().unwrap_or_default()
                ),
            ))
        }
    }
}

impl Transport for MemoryTransport {
    fn get_schema(&mut self, _name: Option<&str>) -> Result<Value, TransportError> {
        Ok(self.schema.clone())
    }

    fn get_value(&mut self, path: &[String]) -> Result<Value, TransportError> {
        find(&self.value, path)
            .cloned()
            .ok_or_else(|| Self::rejected(path, "no value at path"))
    }

    fn set_value(&mut self, path: &[String], value: Value) -> Result<Value, TransportError> {
        if self.poisoned.contains(&format_path(path)) {
            return Err(Self::rejected(path, "path is poisoned"));
        }
        let resolved = self.type_at(path)?;
        self.check_shape(path, &resolved, &value)?;
        let slot = find_mut(&mut self.value, path)
            .ok_or_else(|| Self::rejected(path, "no value at path"))?;
        *slot = value;
        Ok(slot.clone())
    }

    fn new_list_item(&mut self, path: &[String]) -> Result<Option<usize>, TransportError> {
        let resolved = self.type_at(path)?;
        if resolved.type_tag() != Some(tag::ARRAY) {
            return Err(Self::rejected(path, "cannot allocate an element here"));
        }
        let items = resolved
            .items()
            .ok_or_else(|| Self::rejected(path, "array type without an item type"))?;
        let element_type =
            resolve(items, &self.schema).map_err(|e| Self::schema_error(path, e))?;
        let element = default_value(&element_type, &self.schema)
            .map_err(|e| Self::schema_error(path, e))?;
        let slot = find_mut(&mut self.value, path)
            .ok_or_else(|| Self::rejected(path, "no value at path"))?;
        let elements = slot
            .as_array_mut()
            .ok_or_else(|| Self::rejected(path, "value is not an array"))?;
        elements.push(element);
        Ok(Some(elements.len() - 1))
    }

    fn new_named_item(
        &mut self,
        path: &[String],
        candidate: &str,
    ) -> Result<Option<String>, TransportError> {
        let resolved = self.type_at(path)?;
        let item_schema = resolved
            .metadata()
            .value_items
            .ok_or_else(|| Self::rejected(path, "object does not take named members"))?;
        let member_type =
            resolve(&item_schema, &self.schema).map_err(|e| Self::schema_error(path, e))?;
        let member = default_value(&member_type, &self.schema)
            .map_err(|e| Self::schema_error(path, e))?;
        let slot = find_mut(&mut self.value, path)
            .ok_or_else(|| Self::rejected(path, "no value at path"))?;
        let members = slot
            .as_object_mut()
            .ok_or_else(|| Self::rejected(path, "value is not an object"))?;
        // Deduplicate colliding names by suffixing.
        let mut key = candidate.to_string();
        let mut suffix = 2;
        while members.contains_key(&key) {
            key = format!("{candidate}_{suffix}");
            suffix += 1;
        }
        members.insert(key.clone(), member);
        Ok(Some(key))
    }

    fn remove_item(&mut self, path: &[String]) -> Result<bool, TransportError> {
        let Some((parent, key)) = split_last(path) else {
            return Ok(false);
        };
        let Some(slot) = find_mut(&mut self.value, parent) else {
            return Ok(false);
        };
        let removed = match slot {
            Value::Object(members) => members.shift_remove(key).is_some(),
            Value::Array(elements) => match key.parse::<usize>() {
                Ok(index) if index < elements.len() => {
                    elements.remove(index);
                    true
                }
                _ => false,
            },
            _ => false,
        };
        Ok(removed)
    }

    fn get_type(&mut self, path: &[String]) -> Result<Value, TransportError> {
        Ok(self.type_at(path)?.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryTransport {
        let schema = json!({
            "$defs": {
                "file": {"type": "string", "brainvisa": {"path_type": "file"}},
            },
            "type": "object",
            "properties": {
                "s": {"type": "string"},
                "n": {"type": "integer"},
                "li": {"type": "array", "items": {"type": "integer"}},
                "lo": {"type": "array", "items": {"type": "object", "properties": {
                    "x": {"type": "integer"},
                }}},
                "f": {"$ref": "#/$defs/file"},
                "oks": {
                    "type": "object",
                    "brainvisa": {"value_items": {"type": "string"}},
                    "properties": {},
                },
            }
        });
        let value = json!({
            "s": "hello",
            "n": 42,
            "li": [1, 2],
            "lo": [{"x": 1}],
            "f": "/somewhere/a_file",
            "oks": {},
        });
        MemoryTransport::new(schema, value)
    }

    #[test]
    fn get_value_walks_paths() {
        let mut store = store();
        assert_eq!(store.get_value(&["n".into()]).unwrap(), json!(42));
        assert_eq!(
            store.get_value(&["lo".into(), "0".into(), "x".into()]).unwrap(),
            json!(1)
        );
        assert_eq!(store.get_value(&[]).unwrap()["s"], json!("hello"));
        assert!(store.get_value(&["ghost".into()]).is_err());
    }

    #[test]
    fn set_value_checks_shape() {
        let mut store = store();
        store.set_value(&["n".into()], json!(43)).unwrap();
        assert_eq!(store.value()["n"], json!(43));
        assert!(store.set_value(&["n".into()], json!("nope")).is_err());
        assert!(store.set_value(&["li".into()], json!([1, "x"])).is_err());
        store.set_value(&["li".into()], json!([3, 4, 5])).unwrap();
    }

    #[test]
    fn set_value_resolves_references() {
        let mut store = store();
        store
            .set_value(&["f".into()], json!("/elsewhere"))
            .unwrap();
        assert!(store.set_value(&["f".into()], json!(1)).is_err());
    }

    #[test]
    fn new_list_item_appends_defaults() {
        let mut store = store();
        assert_eq!(store.new_list_item(&["li".into()]).unwrap(), Some(2));
        assert_eq!(store.value()["li"], json!([1, 2, 0]));
        assert_eq!(store.new_list_item(&["lo".into()]).unwrap(), Some(1));
        assert_eq!(store.value()["lo"][1], json!({"x": 0}));
        assert!(store.new_list_item(&["n".into()]).is_err());
    }

    #[test]
    fn new_named_item_deduplicates_keys() {
        let mut store = store();
        assert_eq!(
            store.new_named_item(&["oks".into()], "foo").unwrap(),
            Some("foo".to_string())
        );
        assert_eq!(
            store.new_named_item(&["oks".into()], "foo").unwrap(),
            Some("foo_2".to_string())
        );
        assert_eq!(
            store.new_named_item(&["oks".into()], "foo").unwrap(),
            Some("foo_3".to_string())
        );
        assert_eq!(store.value()["oks"], json!({"foo": "", "foo_2": "", "foo_3": ""}));
        assert!(store.new_named_item(&["s".into()], "x").is_err());
    }

    #[test]
    fn remove_item_deletes_members_and_elements() {
        let mut store = store();
        assert!(store.remove_item(&["s".into()]).unwrap());
        assert!(store.value().get("s").is_none());
        assert!(!store.remove_item(&["s".into()]).unwrap());
        assert!(store.remove_item(&["li".into(), "0".into()]).unwrap());
        assert_eq!(store.value()["li"], json!([2]));
        assert!(!store.remove_item(&["li".into(), "9".into()]).unwrap());
        assert!(!store.remove_item(&[]).unwrap());
    }

    #[test]
    fn get_type_descends_and_follows_dynamic_members() {
        let mut store = store();
        let n = store.get_type(&["n".into()]).unwrap();
        assert_eq!(n["type"], json!("integer"));
        let element = store.get_type(&["lo".into(), "0".into()]).unwrap();
        assert_eq!(element["type"], json!("object"));
        store.new_named_item(&["oks".into()], "dyn").unwrap();
        let member = store.get_type(&["oks".into(), "dyn".into()]).unwrap();
        assert_eq!(member["type"], json!("string"));
        assert!(store.get_type(&["n".into(), "deep".into()]).is_err());
    }

    #[test]
    fn type_at_resolves_reference_targets() {
        let mut store = store();
        let f = store.get_type(&["f".into()]).unwrap();
        assert_eq!(f["type"], json!("string"));
        assert_eq!(f["brainvisa"]["path_type"], json!("file"));
    }
}
