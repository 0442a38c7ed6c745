//! Shared test utilities for kindred-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use kindred_core::enums::CachePolicy;
    use kindred_core::requests::{RecordInput, SchemaRegistration};
    use serde_json::{Value, json};

    use crate::KindredDb;
    use crate::service::KindredService;
    use crate::trail::writer::TrailWriter;

    /// In-memory service with the trail disabled.
    pub async fn test_service() -> KindredService {
        let db = KindredDb::open_in_memory().await.unwrap();
        KindredService::from_db(db, TrailWriter::disabled(), CachePolicy::InvalidateOnRegister)
            .with_actor("tester")
    }

    /// In-memory service writing its trail to `trail_dir`.
    pub async fn test_service_with_trail(trail_dir: std::path::PathBuf) -> KindredService {
        let db = KindredDb::open_in_memory().await.unwrap();
        let trail = TrailWriter::new(trail_dir).unwrap();
        KindredService::from_db(db, trail, CachePolicy::InvalidateOnRegister).with_actor("tester")
    }

    /// `ns:Widget:1.0.0` requiring a string `name`.
    pub fn widget_registration() -> SchemaRegistration {
        SchemaRegistration {
            id: "widget-schema".into(),
            kind: "ns:Widget:1.0.0".into(),
            status: None,
            schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "size": {"type": "integer"}
                },
                "required": ["name"]
            }),
            schema_info: None,
        }
    }

    /// Service with the widget schema registered.
    pub async fn widget_service() -> KindredService {
        let svc = test_service().await;
        svc.register_schema(widget_registration()).await.unwrap();
        svc
    }

    pub fn widget_value(id: &str, data: Value) -> Value {
        json!({
            "id": id,
            "kind": "ns:Widget:1.0.0",
            "acl": {"viewers": ["data.default.viewers@example.com"]},
            "legal": {"legaltags": ["example-public"]},
            "data": data
        })
    }

    pub fn widget(id: &str, data: Value) -> RecordInput {
        RecordInput::from_value(&widget_value(id, data)).unwrap()
    }
}
