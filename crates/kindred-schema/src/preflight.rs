//! Offline manifest validation.
//!
//! A manifest is a list of records, an object with a `records` or
//! `ReferenceData` list, or a single record object. Preflight checks each record's required fields,
//! resolves its kind and validates its `data`, without persisting anything.

use kindred_core::MISSING_ID;
use kindred_core::errors::CoreError;
use kindred_core::requests::RecordInput;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::resolver::SchemaResolver;
use crate::source::SchemaSource;
use crate::validator::validate;

/// Records contained in a manifest document.
///
/// # Errors
///
/// `CoreError::InvalidField` for a manifest that is neither a list nor an
/// object, or whose `records` or `ReferenceData` entry is not a list.
pub fn manifest_records(manifest: Value) -> Result<Vec<Value>, CoreError> {
    match manifest {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            let wrapped = ["records", "ReferenceData"]
                .into_iter()
                .find_map(|field| map.remove(field).map(|list| (field, list)));
            match wrapped {
                Some((_, Value::Array(items))) => Ok(items),
                Some((field, _)) => Err(CoreError::InvalidField {
                    field: field.to_string(),
                    reason: "expected a list of records".to_string(),
                }),
                None => Ok(vec![Value::Object(map)]),
            }
        }
        _ => Err(CoreError::InvalidField {
            field: "manifest".to_string(),
            reason: "expected a list or an object".to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightIssue {
    /// 1-based position in the manifest.
    pub index: usize,
    pub id: String,
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightReport {
    pub checked: usize,
    pub issues: Vec<PreflightIssue>,
}

impl PreflightReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate every record without writing anything.
pub async fn preflight<S: SchemaSource>(
    resolver: &SchemaResolver,
    source: &S,
    records: &[Value],
) -> PreflightReport {
    let mut report = PreflightReport {
        checked: records.len(),
        issues: Vec::new(),
    };

    for (offset, record) in records.iter().enumerate() {
        let label = |field: &str| {
            record
                .get(field)
                .and_then(Value::as_str)
                .unwrap_or(MISSING_ID)
                .to_string()
        };
        let issue = |reason: String| PreflightIssue {
            index: offset + 1,
            id: label("id"),
            kind: label("kind"),
            reason,
        };

        let input = match RecordInput::from_value(record) {
            Ok(input) => input,
            Err(e) => {
                report.issues.push(issue(e.to_string()));
                continue;
            }
        };

        let outcome = match resolver.resolve(source, &input.kind).await {
            Ok(schema) => validate(&schema, &Value::Object(input.data)),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => debug!(id = %input.id, "record passed preflight"),
            Err(e) => report.issues.push(issue(e.to_string())),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySchemaStore;
    use kindred_core::entities::SchemaDocument;
    use kindred_core::enums::SchemaStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn manifest_shapes() {
        assert_eq!(manifest_records(json!([{"id": 1}, {"id": 2}])).unwrap().len(), 2);
        assert_eq!(manifest_records(json!({"records": [{"id": 1}]})).unwrap().len(), 1);
        assert_eq!(
            manifest_records(json!({"id": "solo"})).unwrap(),
            vec![json!({"id": "solo"})]
        );
        assert_eq!(
            manifest_records(json!({"ReferenceData": [{"id": 1}, {"id": 2}]})).unwrap(),
            vec![json!({"id": 1}), json!({"id": 2})]
        );
        assert!(manifest_records(json!({"ReferenceData": {"id": 1}})).is_err());
        assert!(manifest_records(json!("nope")).is_err());
        assert!(manifest_records(json!({"records": "nope"})).is_err());
    }

    #[tokio::test]
    async fn preflight_reports_each_bad_record() {
        let store = MemorySchemaStore::new();
        store.put(
            SchemaDocument::new(
                "ns:Widget:1.0.0".into(),
                "ns:Widget:1.0.0",
                SchemaStatus::Published,
                json!({"type": "object", "required": ["name"]}),
            )
            .unwrap(),
        );
        let resolver = SchemaResolver::default();
        let records = vec![
            json!({"id": "ok", "kind": "ns:Widget:1.0.0", "acl": {}, "legal": {}, "data": {"name": "a"}}),
            json!({"id": "bad", "kind": "ns:Widget:1.0.0", "acl": {}, "legal": {}, "data": {}}),
            json!({"kind": "ns:Widget:1.0.0"}),
            json!({"id": "ghost", "kind": "ns:Ghost:1.0.0", "acl": {}, "legal": {}, "data": {}}),
        ];

        let report = preflight(&resolver, &store, &records).await;
        assert_eq!(report.checked, 4);
        assert!(!report.passed());
        let ids: Vec<&str> = report.issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["bad", MISSING_ID, "ghost"]);
        assert_eq!(report.issues[1].index, 3);
        assert!(report.issues[2].reason.contains("Unresolvable"));
    }
}
