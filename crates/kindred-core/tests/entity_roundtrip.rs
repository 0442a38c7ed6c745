//! Serde roundtrip and JsonSchema validation tests for entity and response types.

use chrono::Utc;
use kindred_core::entities::*;
use kindred_core::enums::*;
use kindred_core::requests::*;
use kindred_core::responses::*;
use kindred_core::trail::TrailOperation;
use schemars::schema_for;
use serde_json::{Map, json};

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

fn object(value: serde_json::Value) -> Map<String, serde_json::Value> {
    value.as_object().cloned().expect("object literal")
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

roundtrip_and_validate!(
    record_roundtrip,
    Record,
    Record {
        id: "w1".into(),
        kind: "ns:Widget:1.0.0".into(),
        acl: object(json!({"owners": ["data.default.owners@opendes"]})),
        legal: object(json!({"legaltags": ["opendes-public"], "otherRelevantDataCountries": ["US"]})),
        data: object(json!({"name": "Foo", "depth": {"value": 12.5, "unit": "m"}})),
        version: 2,
        deleted: true,
        deleted_at: Some(Utc::now()),
        create_user: "system".into(),
        create_time: Utc::now(),
        modify_user: "system".into(),
        modify_time: Utc::now(),
    }
);

roundtrip_and_validate!(
    schema_document_roundtrip,
    SchemaDocument,
    SchemaDocument::new(
        "osdu:wks:master-data--Well:1.0.0".into(),
        "osdu:wks:master-data--Well:1.0.0",
        SchemaStatus::Published,
        json!({
            "type": "object",
            "x-osdu-inheriting-from-kind": [{"kind": "osdu:wks:AbstractFacility:1.0.0"}],
            "properties": {"FacilityName": {"type": "string"}}
        }),
    )
    .unwrap()
);

roundtrip_and_validate!(
    record_input_roundtrip,
    RecordInput,
    RecordInput {
        id: "w1".into(),
        kind: "ns:Widget:1.0.0".into(),
        acl: Map::new(),
        legal: Map::new(),
        data: object(json!({"name": "Foo"})),
    }
);

roundtrip_and_validate!(
    record_patch_roundtrip,
    RecordPatch,
    RecordPatch {
        id: Some("w1".into()),
        data: Some(object(json!({"name": "Bar"}))),
        expected_version: Some(1),
        ..RecordPatch::default()
    }
);

roundtrip_and_validate!(
    batch_report_roundtrip,
    BatchReport,
    BatchReport {
        record_count: 1,
        record_ids: vec!["w1".into()],
        record_errors: vec![ItemError {
            id: "w2".into(),
            code: ErrorCode::SchemaValidationError,
            reason: "\"name\" is a required property".into(),
        }],
    }
);

roundtrip_and_validate!(
    patch_outcome_roundtrip,
    PatchOutcome,
    PatchOutcome::new("w1".into(), 2, vec!["data".into()])
);

roundtrip_and_validate!(
    retrieve_response_roundtrip,
    RetrieveResponse,
    RetrieveResponse {
        records: vec![],
        missing_record_ids: vec!["w9".into()],
    }
);

roundtrip_and_validate!(
    trail_operation_roundtrip,
    TrailOperation,
    TrailOperation {
        v: 1,
        ts: Utc::now().to_rfc3339(),
        op: TrailOp::Ingest,
        entity: EntityType::Record,
        id: "w1".into(),
        version: Some(1),
        data: json!({"kind": "ns:Widget:1.0.0"}),
    }
);

#[test]
fn delete_outcome_wire_shape() {
    let value = serde_json::to_value(DeleteOutcome::new("w1".into())).unwrap();
    assert_eq!(value, json!({"id": "w1", "status": "soft-deleted"}));
}

#[test]
fn retrieve_response_wire_shape() {
    let value = serde_json::to_value(RetrieveResponse::default()).unwrap();
    assert_eq!(value, json!({"records": [], "missingRecordIds": []}));
}
