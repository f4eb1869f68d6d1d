//! Entity document helpers
//!
//! An entity travels as a JSON object:
//!
//! ```json
//! { "id": "7", "kind": "character", "properties": { ... },
//!   "metadata": { "createdAt": 0, "updatedAt": 0 } }
//! ```

use crate::{Errno, KResult};
use serde_json::{Map, Value};

pub const ID: &str = "id";
pub const KIND: &str = "kind";
pub const PROPERTIES: &str = "properties";
pub const METADATA: &str = "metadata";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Builds a fresh entity document
pub fn new_entity(id: &str, kind: &str, properties: Map<String, Value>, now_millis: u64) -> Value {
    let mut metadata = Map::new();
    metadata.insert(CREATED_AT.to_string(), Value::from(now_millis));
    metadata.insert(UPDATED_AT.to_string(), Value::from(now_millis));

    let mut doc = Map::new();
    doc.insert(ID.to_string(), Value::from(id));
    doc.insert(KIND.to_string(), Value::from(kind));
    doc.insert(PROPERTIES.to_string(), Value::Object(properties));
    doc.insert(METADATA.to_string(), Value::Object(metadata));
    Value::Object(doc)
}

/// Returns the object at `key`, inserting an empty object if absent
///
/// Fails with `EINVAL` if `doc` is not an object or the existing value at
/// `key` is not an object.
pub fn object_entry<'a>(doc: &'a mut Value, key: &str) -> KResult<&'a mut Map<String, Value>> {
    let map = doc.as_object_mut().ok_or(Errno::EINVAL)?;
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut().ok_or(Errno::EINVAL)
}

/// Returns the document's `properties` map, creating it if absent
pub fn properties_mut(doc: &mut Value) -> KResult<&mut Map<String, Value>> {
    object_entry(doc, PROPERTIES)
}

/// Sets `metadata.updatedAt`
pub fn touch(doc: &mut Value, now_millis: u64) -> KResult<()> {
    let metadata = object_entry(doc, METADATA)?;
    metadata.insert(UPDATED_AT.to_string(), Value::from(now_millis));
    Ok(())
}

/// Reads `metadata.updatedAt`, if present
pub fn updated_at(doc: &Value) -> Option<u64> {
    doc.get(METADATA)?.get(UPDATED_AT)?.as_u64()
}

/// Shallow-merges `partial` into the document's `properties`
pub fn merge_properties(doc: &mut Value, partial: &Map<String, Value>) -> KResult<()> {
    let properties = properties_mut(doc)?;
    for (key, value) in partial {
        properties.insert(key.clone(), value.clone());
    }
    Ok(())
}

/// True for `null`, `{}` and `[]`
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Reads a string field from an argument object
pub fn str_field<'a>(arg: &'a Value, key: &str) -> Option<&'a str> {
    arg.get(key).and_then(Value::as_str)
}

/// Reads a required string field, failing with `EINVAL`
pub fn require_str<'a>(arg: &'a Value, key: &str) -> KResult<&'a str> {
    str_field(arg, key).ok_or(Errno::EINVAL)
}
