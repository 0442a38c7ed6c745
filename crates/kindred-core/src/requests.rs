//! Inbound request shapes.
//!
//! Inputs arrive as loose JSON. `from_value` constructors check presence and
//! shape field by field so callers get a `CoreError` naming the offending
//! field instead of a serde message.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::SchemaDocument;
use crate::enums::SchemaStatus;
use crate::errors::CoreError;

/// Required record fields, in the order they are checked.
pub const REQUIRED_RECORD_FIELDS: [&str; 5] = ["id", "kind", "acl", "legal", "data"];

/// A record submitted for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RecordInput {
    pub id: String,
    pub kind: String,
    pub acl: Map<String, Value>,
    pub legal: Map<String, Value>,
    pub data: Map<String, Value>,
}

impl RecordInput {
    /// Check `id, kind, acl, legal, data` in order and extract them.
    ///
    /// # Errors
    ///
    /// `CoreError::MissingField` for the first absent (or null) field,
    /// `CoreError::InvalidField` when a field has the wrong JSON type or the
    /// id is padded with whitespace.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let obj = value.as_object().ok_or_else(|| CoreError::InvalidField {
            field: "record".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        for field in REQUIRED_RECORD_FIELDS {
            if obj.get(field).is_none_or(Value::is_null) {
                return Err(CoreError::MissingField(field.to_string()));
            }
        }

        Ok(Self {
            id: record_id(obj)?,
            kind: required_string(obj, "kind")?,
            acl: required_object(obj, "acl")?,
            legal: required_object(obj, "legal")?,
            data: required_object(obj, "data")?,
        })
    }
}

/// A partial update. Absent fields are left as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// When set, the write only succeeds if the stored version matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl RecordPatch {
    /// Parse a patch body.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidField` when the body is not an object or a field has
    /// the wrong JSON type.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let obj = value.as_object().ok_or_else(|| CoreError::InvalidField {
            field: "patch".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        let expected_version = match obj.get("expectedVersion") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_u64().ok_or_else(|| CoreError::InvalidField {
                field: "expectedVersion".to_string(),
                reason: "expected a positive integer".to_string(),
            })?),
        };

        Ok(Self {
            id: optional_string(obj, "id")?,
            kind: optional_string(obj, "kind")?,
            acl: optional_object(obj, "acl")?,
            legal: optional_object(obj, "legal")?,
            data: optional_object(obj, "data")?,
            expected_version,
        })
    }

    /// True when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.kind.is_none() && self.acl.is_none() && self.legal.is_none() && self.data.is_none()
    }

    /// Names of the fields this patch touches.
    #[must_use]
    pub fn updated_fields(&self) -> Vec<String> {
        [
            ("kind", self.kind.is_some()),
            ("acl", self.acl.is_some()),
            ("legal", self.legal.is_some()),
            ("data", self.data.is_some()),
        ]
        .into_iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SchemaInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A schema registration request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRegistration {
    pub id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_info: Option<SchemaInfo>,
}

impl SchemaRegistration {
    /// Parse a registration body; `id`, `kind` and `schema` are required.
    ///
    /// # Errors
    ///
    /// `CoreError::MissingField` or `CoreError::InvalidField`.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let obj = value.as_object().ok_or_else(|| CoreError::InvalidField {
            field: "schema registration".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        for field in ["id", "kind", "schema"] {
            if obj.get(field).is_none_or(Value::is_null) {
                return Err(CoreError::MissingField(field.to_string()));
            }
        }

        let schema_info = obj
            .get("schemaInfo")
            .and_then(Value::as_object)
            .map(|info| SchemaInfo {
                status: info.get("status").and_then(Value::as_str).map(String::from),
            });

        Ok(Self {
            id: required_string(obj, "id")?,
            kind: required_string(obj, "kind")?,
            status: optional_string(obj, "status")?,
            schema: obj.get("schema").cloned().unwrap_or(Value::Null),
            schema_info,
        })
    }

    /// Explicit status, then `schemaInfo.status`, then `PUBLISHED`.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidField` for an unknown status string.
    pub fn effective_status(&self) -> Result<SchemaStatus, CoreError> {
        self.status
            .as_deref()
            .or_else(|| self.schema_info.as_ref().and_then(|i| i.status.as_deref()))
            .map_or(Ok(SchemaStatus::Published), str::parse)
    }

    /// Convert into a storable document.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidKind` for a malformed kind, `CoreError::InvalidField`
    /// for a bad status or a schema body that is not an object.
    pub fn into_document(self) -> Result<SchemaDocument, CoreError> {
        if !self.schema.is_object() {
            return Err(CoreError::InvalidField {
                field: "schema".to_string(),
                reason: "expected a JSON object".to_string(),
            });
        }
        let status = self.effective_status()?;
        SchemaDocument::new(self.id, &self.kind, status, self.schema)
    }
}

fn required_string(obj: &Map<String, Value>, field: &str) -> Result<String, CoreError> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(CoreError::MissingField(field.to_string())),
        Some(_) => Err(CoreError::InvalidField {
            field: field.to_string(),
            reason: "expected a string".to_string(),
        }),
        None => Err(CoreError::MissingField(field.to_string())),
    }
}

/// Lookups trim ids, so a stored id must already be trimmed.
fn record_id(obj: &Map<String, Value>) -> Result<String, CoreError> {
    let id = required_string(obj, "id")?;
    if id.trim() != id {
        return Err(CoreError::InvalidField {
            field: "id".to_string(),
            reason: "leading or trailing whitespace".to_string(),
        });
    }
    Ok(id)
}

fn required_object(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<Map<String, Value>, CoreError> {
    optional_object(obj, field)?.ok_or_else(|| CoreError::MissingField(field.to_string()))
}

fn optional_string(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, CoreError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CoreError::InvalidField {
            field: field.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

fn optional_object(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<Option<Map<String, Value>>, CoreError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(CoreError::InvalidField {
            field: field.to_string(),
            reason: "expected a JSON object".to_string(),
        }),
    }
}

/// Best-effort id of a loose item, used to label per-item batch errors.
#[must_use]
pub fn item_id(value: &Value) -> Option<String> {
    value
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
}
