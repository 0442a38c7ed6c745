//! Payload validation against a resolved schema.
//!
//! Wraps `jsonschema` with draft auto-detection. Pure: no I/O, no shared
//! state. References the resolver could not expand are swapped for the
//! permissive `{}` schema on a private copy, so the engine never tries to
//! fetch them.

use std::borrow::Cow;

use kindred_core::kind::is_local_pointer;
use serde_json::{Map, Value};

use crate::error::{SchemaError, ValidationFailure, Violation};
use crate::resolver::ResolvedSchema;

/// Validate `instance` against `schema`.
///
/// # Errors
///
/// `SchemaError::Compile` if the schema is not compilable,
/// `SchemaError::ValidationFailed` with every violation otherwise.
pub fn validate(schema: &ResolvedSchema, instance: &Value) -> Result<(), SchemaError> {
    let prepared = if contains_foreign_ref(&schema.merged_schema) {
        let mut copy = schema.merged_schema.clone();
        neutralize_foreign_refs(&mut copy);
        Cow::Owned(copy)
    } else {
        Cow::Borrowed(&schema.merged_schema)
    };

    let validator = jsonschema::validator_for(&prepared).map_err(|e| SchemaError::Compile {
        kind: schema.kind.clone(),
        reason: format!("{e}"),
    })?;

    let violations: Vec<Violation> = validator
        .iter_errors(instance)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: format!("{e}"),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::ValidationFailed(ValidationFailure { violations }))
    }
}

fn is_foreign_ref_node(map: &Map<String, Value>) -> bool {
    matches!(map.get("$ref"), Some(Value::String(r)) if !is_local_pointer(r))
}

fn contains_foreign_ref(node: &Value) -> bool {
    match node {
        Value::Object(map) => is_foreign_ref_node(map) || map.values().any(contains_foreign_ref),
        Value::Array(items) => items.iter().any(contains_foreign_ref),
        _ => false,
    }
}

fn neutralize_foreign_refs(node: &mut Value) {
    match node {
        Value::Object(map) if is_foreign_ref_node(map) => *node = Value::Object(Map::new()),
        Value::Object(map) => map.values_mut().for_each(neutralize_foreign_refs),
        Value::Array(items) => items.iter_mut().for_each(neutralize_foreign_refs),
        _ => {}
    }
}
