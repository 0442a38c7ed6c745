use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::INHERITANCE_KEY;
use crate::enums::SchemaStatus;
use crate::errors::CoreError;
use crate::kind::Kind;

/// A registered, unresolved schema document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub id: String,
    pub kind: String,
    pub status: SchemaStatus,
    #[schemars(with = "String")]
    pub version: Version,
    pub raw_schema: Value,
    pub parent_kinds: Vec<String>,
    pub created_time: DateTime<Utc>,
    pub modify_time: DateTime<Utc>,
}

impl SchemaDocument {
    /// Build a document from a kind string and raw schema body. The version
    /// comes from the kind; parent kinds are read from the inheritance
    /// declaration in declared order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidKind` if `kind` does not parse.
    pub fn new(
        id: String,
        kind: &str,
        status: SchemaStatus,
        raw_schema: Value,
    ) -> Result<Self, CoreError> {
        let parsed = Kind::parse(kind.trim())?;
        let now = Utc::now();
        Ok(Self {
            id,
            kind: kind.trim().to_string(),
            status,
            version: parsed.version().clone(),
            parent_kinds: extract_parent_kinds(&raw_schema),
            raw_schema,
            created_time: now,
            modify_time: now,
        })
    }

    /// Canonical three-part kind, or the stored kind string when it no longer
    /// parses.
    #[must_use]
    pub fn canonical_kind(&self) -> String {
        crate::kind::lookup_key(&self.kind)
    }
}

/// The JSON Schema body of a stored document.
///
/// Registration resources are sometimes stored whole, as
/// `{"schemaInfo": {..}, "schema": {..}}`; the body is then the inner
/// `schema` object.
#[must_use]
pub fn schema_body(raw_schema: &Value) -> &Value {
    match raw_schema.get("schema") {
        Some(inner @ Value::Object(_)) if raw_schema.get("schemaInfo").is_some() => inner,
        _ => raw_schema,
    }
}

/// Read the inheritance declaration of a raw schema.
///
/// Accepts a single string, a list of strings, or a list of objects that
/// carry the parent under `kind` (or `name`). Anything else is ignored.
#[must_use]
pub fn extract_parent_kinds(raw_schema: &Value) -> Vec<String> {
    fn entry(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("kind")
                .or_else(|| map.get("name"))
                .and_then(Value::as_str)
                .map(String::from),
            _ => None,
        }
    }

    match schema_body(raw_schema).get(INHERITANCE_KEY) {
        Some(Value::Array(items)) => items.iter().filter_map(entry).collect(),
        Some(single) => entry(single).into_iter().collect(),
        None => Vec::new(),
    }
}
