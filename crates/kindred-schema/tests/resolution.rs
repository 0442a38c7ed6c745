//! Resolution behaviour over an in-memory schema store.

use std::sync::Arc;

use kindred_core::entities::SchemaDocument;
use kindred_core::enums::{CachePolicy, SchemaStatus};
use kindred_schema::{MemorySchemaStore, SchemaError, SchemaResolver, validate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn register(store: &MemorySchemaStore, kind: &str, schema: Value) {
    store.put(SchemaDocument::new(kind.into(), kind, SchemaStatus::Published, schema).unwrap());
}

#[tokio::test]
async fn self_reference_collapses_to_empty_object() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:Node:1.0.0",
        json!({
            "type": "object",
            "properties": {
                "value": {"type": "string"},
                "child": {"$ref": "ns:Node:1.0.0"}
            }
        }),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "ns:Node:1.0.0")
        .await
        .unwrap();
    assert_eq!(resolved.merged_schema["properties"]["child"], json!({}));
    assert_eq!(resolved.merged_schema["properties"]["value"], json!({"type": "string"}));
}

#[tokio::test]
async fn mutual_references_terminate() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:A:1.0.0",
        json!({"properties": {"b": {"$ref": "ns:B:1.0.0"}}}),
    );
    register(
        &store,
        "ns:B:1.0.0",
        json!({"properties": {"a": {"$ref": "ns:A:1.0.0"}}}),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "ns:A:1.0.0")
        .await
        .unwrap();
    assert_eq!(
        resolved.merged_schema,
        json!({"properties": {"b": {"properties": {"a": {}}}}})
    );
}

#[tokio::test]
async fn diamond_inheritance_prefers_child_then_first_parent() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:Base:1.0.0",
        json!({"properties": {"id": {"type": "string"}}, "required": ["id"]}),
    );
    register(
        &store,
        "ns:Left:1.0.0",
        json!({
            "x-osdu-inheriting-from-kind": ["ns:Base:1.0.0"],
            "properties": {"shared": {"type": "string"}, "left": {"type": "number"}},
            "required": ["shared"]
        }),
    );
    register(
        &store,
        "ns:Right:1.0.0",
        json!({
            "x-osdu-inheriting-from-kind": ["ns:Base:1.0.0"],
            "properties": {"shared": {"type": "integer"}, "own": {"type": "integer"}},
            "required": ["shared", "own"]
        }),
    );
    register(
        &store,
        "ns:Child:1.0.0",
        json!({
            "type": "object",
            "x-osdu-inheriting-from-kind": ["ns:Left:1.0.0", "ns:Right:1.0.0"],
            "properties": {"own": {"type": "boolean"}},
            "required": ["own"]
        }),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "ns:Child:1.0.0")
        .await
        .unwrap();
    let schema = &resolved.merged_schema;

    assert!(schema.get("x-osdu-inheriting-from-kind").is_none());
    assert_eq!(schema["properties"]["own"], json!({"type": "boolean"}));
    assert_eq!(schema["properties"]["shared"], json!({"type": "string"}));
    assert_eq!(schema["properties"]["left"], json!({"type": "number"}));
    assert_eq!(schema["properties"]["id"], json!({"type": "string"}));
    assert_eq!(schema["required"], json!(["own", "shared", "id"]));
}

#[tokio::test]
async fn inheritance_cycle_skips_the_repeated_parent() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:P:1.0.0",
        json!({
            "x-osdu-inheriting-from-kind": ["ns:Q:1.0.0"],
            "properties": {"p": {"type": "string"}}
        }),
    );
    register(
        &store,
        "ns:Q:1.0.0",
        json!({
            "x-osdu-inheriting-from-kind": ["ns:P:1.0.0"],
            "properties": {"q": {"type": "string"}}
        }),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "ns:P:1.0.0")
        .await
        .unwrap();
    let props = resolved.merged_schema["properties"].as_object().unwrap();
    assert!(props.contains_key("p"));
    assert!(props.contains_key("q"));
}

#[tokio::test]
async fn missing_parent_is_a_hard_failure() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:Orphan:1.0.0",
        json!({"x-osdu-inheriting-from-kind": ["ns:Gone:1.0.0"]}),
    );

    let err = SchemaResolver::default()
        .resolve(&store, "ns:Orphan:1.0.0")
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::Unresolvable { ref kind, .. } if kind == "ns:Gone:1.0.0"));
}

#[rstest]
#[case::missing_target("ns:Gone:1.0.0")]
#[case::malformed("../abstract/AbstractLegalTags.1.0.0.json")]
#[tokio::test]
async fn unresolved_nested_ref_degrades_softly(#[case] reference: &str) {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:Widget:1.0.0",
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "legal": {"$ref": reference}
            }
        }),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "ns:Widget:1.0.0")
        .await
        .unwrap();
    assert_eq!(resolved.merged_schema["properties"]["legal"], json!({"$ref": reference}));
    assert_eq!(resolved.unresolved_refs, vec![reference.to_string()]);

    // Still usable for validation.
    assert!(validate(&resolved, &json!({"name": "Foo", "legal": "anything"})).is_ok());
    assert!(validate(&resolved, &json!({"name": 1})).is_err());
}

#[tokio::test]
async fn nested_target_with_missing_parent_degrades_softly() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:Broken:1.0.0",
        json!({"x-osdu-inheriting-from-kind": ["ns:Gone:1.0.0"]}),
    );
    register(
        &store,
        "ns:Widget:1.0.0",
        json!({"properties": {"part": {"$ref": "ns:Broken:1.0.0"}}}),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "ns:Widget:1.0.0")
        .await
        .unwrap();
    assert_eq!(resolved.unresolved_refs, vec!["ns:Broken:1.0.0".to_string()]);
}

#[tokio::test]
async fn references_are_normalized_before_lookup() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "wks:AbstractLegalTags:1.0.0",
        json!({"type": "object", "required": ["legaltags"]}),
    );
    register(
        &store,
        "osdu:wks:Well:1.0.0",
        json!({"properties": {"legal": {"$ref": "osdu:wks:AbstractLegalTags:1"}}}),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "osdu:wks:Well:1.0.0")
        .await
        .unwrap();
    assert_eq!(resolved.kind, "wks:Well:1.0.0");
    assert_eq!(
        resolved.merged_schema["properties"]["legal"],
        json!({"type": "object", "required": ["legaltags"]})
    );
    assert!(resolved.unresolved_refs.is_empty());
}

#[tokio::test]
async fn wrapped_registration_resources_are_unwrapped() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:Widget:1.0.0",
        json!({
            "schemaInfo": {"schemaIdentity": {"id": "ns:Widget:1.0.0"}},
            "schema": {"type": "object", "required": ["name"]}
        }),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "ns:Widget:1.0.0")
        .await
        .unwrap();
    assert_eq!(resolved.merged_schema, json!({"type": "object", "required": ["name"]}));
}

#[tokio::test]
async fn schema_id_resolves_when_kind_does_not_match() {
    let store = MemorySchemaStore::new();
    store.put(
        SchemaDocument::new(
            "widget-schema".into(),
            "ns:Widget:1.0.0",
            SchemaStatus::Published,
            json!({"type": "object"}),
        )
        .unwrap(),
    );

    let resolved = SchemaResolver::default()
        .resolve(&store, "widget-schema")
        .await
        .unwrap();
    assert_eq!(resolved.kind, "widget-schema");
}

#[rstest]
#[case(CachePolicy::InvalidateOnRegister, true)]
#[case(CachePolicy::Retain, false)]
#[case(CachePolicy::PerCall, true)]
#[tokio::test]
async fn registration_visibility_follows_cache_policy(
    #[case] policy: CachePolicy,
    #[case] sees_update: bool,
) {
    let store = MemorySchemaStore::new();
    register(&store, "ns:Widget:1.0.0", json!({"type": "object"}));
    let resolver = SchemaResolver::new(policy);

    let before = resolver.resolve(&store, "ns:Widget:1.0.0").await.unwrap();
    assert!(before.merged_schema.get("required").is_none());

    register(
        &store,
        "ns:Widget:1.0.0",
        json!({"type": "object", "required": ["name"]}),
    );
    resolver.schema_registered();

    let after = resolver.resolve(&store, "ns:Widget:1.0.0").await.unwrap();
    assert_eq!(after.merged_schema.get("required").is_some(), sees_update);

    resolver.clear_cache();
    let cleared = resolver.resolve(&store, "ns:Widget:1.0.0").await.unwrap();
    assert!(cleared.merged_schema.get("required").is_some());
}

#[tokio::test]
async fn acyclic_dependencies_are_cached_individually() {
    let store = MemorySchemaStore::new();
    register(&store, "ns:Leaf:1.0.0", json!({"type": "string"}));
    register(
        &store,
        "ns:Root:1.0.0",
        json!({"properties": {"a": {"$ref": "ns:Leaf:1.0.0"}, "b": {"$ref": "ns:Leaf:1.0.0"}}}),
    );
    let resolver = SchemaResolver::new(CachePolicy::Retain);

    resolver.resolve(&store, "ns:Root:1.0.0").await.unwrap();
    assert_eq!(resolver.cached_len(), 2);

    let leaf = resolver.resolve(&store, "ns:Leaf:1.0.0").await.unwrap();
    let again = resolver.resolve(&store, "ns:Leaf:1.0.0").await.unwrap();
    assert!(Arc::ptr_eq(&leaf, &again));
}

#[tokio::test]
async fn cyclic_results_are_not_cached() {
    let store = MemorySchemaStore::new();
    register(
        &store,
        "ns:Node:1.0.0",
        json!({"properties": {"next": {"$ref": "ns:Node:1.0.0"}}}),
    );
    let resolver = SchemaResolver::new(CachePolicy::Retain);
    resolver.resolve(&store, "ns:Node:1.0.0").await.unwrap();
    assert_eq!(resolver.cached_len(), 0);
}
