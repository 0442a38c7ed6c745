//! Inheritance merge of a resolved parent into a child schema body.

use serde_json::{Map, Value};

/// Merge `parent`'s `properties` and `required` into `child`.
///
/// Properties: a name already present in the child is kept as is; new names
/// are appended in the parent's order. Required: set union, first-seen order.
pub fn merge_parent(child: &mut Map<String, Value>, parent: &Value) {
    if let Some(parent_props) = parent.get("properties").and_then(Value::as_object) {
        let mut child_props = match child.remove("properties") {
            Some(Value::Object(props)) => props,
            _ => Map::new(),
        };
        for (name, definition) in parent_props {
            if !child_props.contains_key(name) {
                child_props.insert(name.clone(), definition.clone());
            }
        }
        child.insert("properties".to_string(), Value::Object(child_props));
    }

    if let Some(parent_required) = parent.get("required").and_then(Value::as_array) {
        let mut child_required = match child.remove("required") {
            Some(Value::Array(required)) => required,
            _ => Vec::new(),
        };
        for name in parent_required {
            if !child_required.contains(name) {
                child_required.push(name.clone());
            }
        }
        child.insert("required".to_string(), Value::Array(child_required));
    }
}

/// Drop duplicate entries from a `required` array, keeping first occurrences.
pub fn dedup_required(schema: &mut Map<String, Value>) {
    if let Some(Value::Array(required)) = schema.get_mut("required") {
        let mut seen: Vec<Value> = Vec::with_capacity(required.len());
        required.retain(|name| {
            if seen.contains(name) {
                false
            } else {
                seen.push(name.clone());
                true
            }
        });
    }
}
