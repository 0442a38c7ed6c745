use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored record. `data` must validate against the resolved schema of
/// `kind` at every write.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub kind: String,
    pub acl: Map<String, Value>,
    pub legal: Map<String, Value>,
    pub data: Map<String, Value>,
    pub version: u64,
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub create_user: String,
    pub create_time: DateTime<Utc>,
    pub modify_user: String,
    pub modify_time: DateTime<Utc>,
}

impl Record {
    /// Lift `data` keys to the top level beside `id`, `kind`, `version` and
    /// `modifyTime`. Envelope fields win over data keys of the same name.
    #[must_use]
    pub fn flattened(&self) -> Map<String, Value> {
        let mut flat = self.data.clone();
        flat.insert("id".to_string(), Value::String(self.id.clone()));
        flat.insert("kind".to_string(), Value::String(self.kind.clone()));
        flat.insert("version".to_string(), Value::from(self.version));
        flat.insert(
            "modifyTime".to_string(),
            Value::String(self.modify_time.to_rfc3339()),
        );
        flat
    }
}
