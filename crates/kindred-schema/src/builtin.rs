//! Built-in JSON Schemas for Kindred's own envelopes.
//!
//! `BuiltinSchemas` builds schemas from kindred-core types at construction
//! time using [`schemars::schema_for!`]. They describe the wire shapes of
//! records, requests and reports, not user-registered kinds.

use std::collections::HashMap;

use schemars::schema_for;
use serde_json::Value;

use crate::error::{SchemaError, ValidationFailure, Violation};

/// Named schemas for the request and response envelopes.
pub struct BuiltinSchemas {
    schemas: HashMap<&'static str, Value>,
}

macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        if let Ok(schema) = serde_json::to_value(schema_for!($ty)) {
            $map.insert($name, schema);
        }
    };
}

impl BuiltinSchemas {
    #[must_use]
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        register!(schemas, "record", kindred_core::entities::Record);
        register!(schemas, "schema_document", kindred_core::entities::SchemaDocument);

        register!(schemas, "record_input", kindred_core::requests::RecordInput);
        register!(schemas, "record_patch", kindred_core::requests::RecordPatch);
        register!(
            schemas,
            "schema_registration",
            kindred_core::requests::SchemaRegistration
        );

        register!(schemas, "ingest_outcome", kindred_core::responses::IngestOutcome);
        register!(schemas, "patch_outcome", kindred_core::responses::PatchOutcome);
        register!(schemas, "delete_outcome", kindred_core::responses::DeleteOutcome);
        register!(schemas, "batch_report", kindred_core::responses::BatchReport);
        register!(
            schemas,
            "retrieve_response",
            kindred_core::responses::RetrieveResponse
        );

        register!(schemas, "trail_operation", kindred_core::trail::TrailOperation);

        Self { schemas }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named built-in schema.
    ///
    /// # Errors
    ///
    /// `SchemaError::Unresolvable` for an unknown name, `SchemaError::Compile`
    /// if the schema does not compile, `SchemaError::ValidationFailed` otherwise.
    pub fn validate(&self, name: &str, instance: &Value) -> Result<(), SchemaError> {
        let schema = self.get(name).ok_or_else(|| SchemaError::Unresolvable {
            kind: name.to_string(),
            reason: "no built-in schema with this name".to_string(),
        })?;

        let validator = jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile {
            kind: name.to_string(),
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

    /// All built-in schema names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for BuiltinSchemas {
    fn default() -> Self {
        Self::new()
    }
}
