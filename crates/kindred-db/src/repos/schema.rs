//! Schema registry repository.
//!
//! Stores raw schema documents keyed by id and serves them to the resolver
//! through [`SchemaSource`]. Kind lookups prefer an exact `kind` match and
//! fall back to the canonical kind, newest `modify_time` first.

use std::sync::Arc;

use kindred_core::entities::SchemaDocument;
use kindred_core::enums::{EntityType, TrailOp};
use kindred_core::kind::{Kind, lookup_key};
use kindred_core::requests::SchemaRegistration;
use kindred_core::responses::SchemaRegistered;
use kindred_core::trail::TrailOperation;
use kindred_schema::import::{ImportEntry, ImportState, ImportStatus};
use kindred_schema::{ResolvedSchema, SchemaError, SchemaSource};
use semver::Version;
use tracing::{info, warn};

use crate::error::{DatabaseError, RecordError};
use crate::helpers::{format_datetime, now, parse_datetime, parse_enum, parse_json};
use crate::service::KindredService;

const SCHEMA_COLUMNS: &str =
    "id, kind, status, version, schema, parent_kinds, created_time, modify_time";

fn row_to_schema(row: &libsql::Row) -> Result<SchemaDocument, DatabaseError> {
    let version_text = row.get::<String>(3)?;
    let version = Version::parse(&version_text).map_err(|e| {
        DatabaseError::InvalidState(format!("Invalid schema version '{version_text}': {e}"))
    })?;
    let parent_kinds: Vec<String> = serde_json::from_value(parse_json(
        "parent_kinds",
        &row.get::<String>(5)?,
    )?)
    .map_err(|e| DatabaseError::InvalidState(format!("Invalid parent_kinds: {e}")))?;

    Ok(SchemaDocument {
        id: row.get::<String>(0)?,
        kind: row.get::<String>(1)?,
        status: parse_enum(&row.get::<String>(2)?)?,
        version,
        raw_schema: parse_json("schema", &row.get::<String>(4)?)?,
        parent_kinds,
        created_time: parse_datetime(&row.get::<String>(6)?)?,
        modify_time: parse_datetime(&row.get::<String>(7)?)?,
    })
}

fn version_part(part: u64) -> Result<i64, DatabaseError> {
    i64::try_from(part)
        .map_err(|_| DatabaseError::InvalidState(format!("version component {part} out of range")))
}

impl KindredService {
    /// Upsert a schema document. An existing row keeps its `created_time`.
    pub(crate) async fn write_schema(&self, doc: &SchemaDocument) -> Result<String, DatabaseError> {
        let kind = Kind::parse(&doc.kind).map_err(|e| DatabaseError::InvalidState(e.to_string()))?;
        let schema_text = crate::helpers::to_json_text(&doc.raw_schema)?;
        let parents_text = crate::helpers::to_json_text(&doc.parent_kinds)?;

        self.db()
            .conn()
            .execute(
                "INSERT INTO schema_registry (id, kind, canonical_kind, status, version, authority, namespace,
                    entity_type, version_major, version_minor, version_patch, schema, parent_kinds,
                    created_time, modify_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    canonical_kind = excluded.canonical_kind,
                    status = excluded.status,
                    version = excluded.version,
                    authority = excluded.authority,
                    namespace = excluded.namespace,
                    entity_type = excluded.entity_type,
                    version_major = excluded.version_major,
                    version_minor = excluded.version_minor,
                    version_patch = excluded.version_patch,
                    schema = excluded.schema,
                    parent_kinds = excluded.parent_kinds,
                    modify_time = excluded.modify_time",
                libsql::params![
                    doc.id.as_str(),
                    doc.kind.as_str(),
                    kind.canonical(),
                    doc.status.as_str(),
                    doc.version.to_string(),
                    kind.authority(),
                    kind.namespace(),
                    kind.entity(),
                    version_part(kind.version().major)?,
                    version_part(kind.version().minor)?,
                    version_part(kind.version().patch)?,
                    schema_text,
                    parents_text,
                    format_datetime(&doc.created_time),
                    format_datetime(&doc.modify_time),
                ],
            )
            .await?;
        Ok(doc.id.clone())
    }

    /// Exact kind match first, then canonical kind; newest wins.
    pub(crate) async fn schema_by_kind(
        &self,
        kind: &str,
    ) -> Result<Option<SchemaDocument>, DatabaseError> {
        let wanted = kind.trim();
        let exact = format!(
            "SELECT {SCHEMA_COLUMNS} FROM schema_registry WHERE kind = ?1 ORDER BY modify_time DESC LIMIT 1"
        );
        let mut rows = self.db().conn().query(&exact, [wanted]).await?;
        if let Some(row) = rows.next().await? {
            return row_to_schema(&row).map(Some);
        }

        let canonical = format!(
            "SELECT {SCHEMA_COLUMNS} FROM schema_registry WHERE canonical_kind = ?1 ORDER BY modify_time DESC LIMIT 1"
        );
        let mut rows = self
            .db()
            .conn()
            .query(&canonical, [lookup_key(wanted)])
            .await?;
        match rows.next().await? {
            Some(row) => row_to_schema(&row).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) async fn schema_by_id(
        &self,
        id: &str,
    ) -> Result<Option<SchemaDocument>, DatabaseError> {
        let sql = format!("SELECT {SCHEMA_COLUMNS} FROM schema_registry WHERE id = ?1");
        let mut rows = self.db().conn().query(&sql, [id.trim()]).await?;
        match rows.next().await? {
            Some(row) => row_to_schema(&row).map(Some),
            None => Ok(None),
        }
    }

    /// Store a schema document as-is.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn put_schema(&self, doc: &SchemaDocument) -> Result<String, DatabaseError> {
        let _guard = self.lock().await;
        let id = self.write_schema(doc).await?;
        if self.resolver().schema_registered() {
            tracing::debug!(id = %id, "resolution cache cleared");
        }
        Ok(id)
    }

    /// Register a schema from an inbound registration and record it in the trail.
    ///
    /// # Errors
    ///
    /// `RecordError::MissingField`/`InvalidField` for a malformed
    /// registration, `RecordError::Storage` if the write fails.
    pub async fn register_schema(
        &self,
        registration: SchemaRegistration,
    ) -> Result<SchemaRegistered, RecordError> {
        let doc = registration.into_document()?;
        let _guard = self.lock().await;

        self.db().begin().await?;
        let result = self.write_registration(&doc).await;
        let registered = self.finish(result).await?;

        let cleared = self.resolver().schema_registered();
        info!(id = %registered.id, kind = %registered.kind, cache_cleared = cleared, "schema registered");
        Ok(registered)
    }

    async fn write_registration(&self, doc: &SchemaDocument) -> Result<SchemaRegistered, RecordError> {
        let id = self.write_schema(doc).await?;
        self.trail().append_validated(
            &TrailOperation {
                v: 1,
                ts: format_datetime(&now()),
                op: TrailOp::RegisterSchema,
                entity: EntityType::Schema,
                id: id.clone(),
                version: None,
                data: serde_json::to_value(doc).map_err(|e| DatabaseError::Other(e.into()))?,
            },
            self.builtins(),
        )?;
        Ok(SchemaRegistered {
            id,
            kind: doc.kind.clone(),
            status: doc.status,
        })
    }

    /// Look up a raw schema document by kind, then by id.
    ///
    /// # Errors
    ///
    /// `RecordError::NotFound` when neither matches.
    pub async fn get_schema(&self, reference: &str) -> Result<SchemaDocument, RecordError> {
        let _guard = self.lock().await;
        if let Some(doc) = self.schema_by_kind(reference).await? {
            return Ok(doc);
        }
        self.schema_by_id(reference)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("schema '{reference}'")))
    }

    /// Resolve a kind or schema id to its merged schema.
    ///
    /// # Errors
    ///
    /// `RecordError::Schema` when resolution fails.
    pub async fn resolve_schema(&self, reference: &str) -> Result<Arc<ResolvedSchema>, RecordError> {
        let _guard = self.lock().await;
        Ok(self.resolver().resolve(self, reference).await?)
    }

    /// Every stored schema, ordered by kind.
    ///
    /// # Errors
    ///
    /// `RecordError::Storage` if the query or decoding fails.
    pub async fn list_schemas(&self) -> Result<Vec<SchemaDocument>, RecordError> {
        let _guard = self.lock().await;
        let sql = format!("SELECT {SCHEMA_COLUMNS} FROM schema_registry ORDER BY kind, id");
        let mut rows = self.db().conn().query(&sql, ()).await?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next().await? {
            docs.push(row_to_schema(&row)?);
        }
        Ok(docs)
    }

    /// Register every parsed entry of an import directory, in order.
    pub async fn import_schemas(&self, entries: Vec<ImportEntry>) -> Vec<ImportStatus> {
        let mut statuses = Vec::with_capacity(entries.len());
        for entry in entries {
            let file = entry.file.display().to_string();
            let status = match entry.registration {
                Ok(registration) => {
                    let kind = registration.kind.clone();
                    match self.register_schema(registration).await {
                        Ok(_) => ImportStatus {
                            file,
                            kind: Some(kind),
                            status: ImportState::Registered,
                            reason: None,
                        },
                        Err(e) => {
                            warn!(file = %file, error = %e, "schema import failed");
                            ImportStatus {
                                file,
                                kind: Some(kind),
                                status: ImportState::Failed,
                                reason: Some(e.to_string()),
                            }
                        }
                    }
                }
                Err(reason) => ImportStatus {
                    file,
                    kind: None,
                    status: ImportState::Failed,
                    reason: Some(reason),
                },
            };
            statuses.push(status);
        }
        statuses
    }
}

impl SchemaSource for KindredService {
    async fn get_by_kind(&self, kind: &str) -> Result<Option<SchemaDocument>, SchemaError> {
        self.schema_by_kind(kind)
            .await
            .map_err(|e| SchemaError::Source(e.to_string()))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<SchemaDocument>, SchemaError> {
        self.schema_by_id(id)
            .await
            .map_err(|e| SchemaError::Source(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::helpers::{test_service, widget_registration};
    use kindred_core::enums::SchemaStatus;
    use kindred_core::requests::SchemaRegistration;
    use kindred_schema::SchemaSource;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn register_then_lookup_by_kind_and_id() {
        let svc = test_service().await;
        let registered = svc.register_schema(widget_registration()).await.unwrap();
        assert_eq!(registered.status, SchemaStatus::Published);

        let by_kind = svc.get_by_kind("ns:Widget:1.0.0").await.unwrap().unwrap();
        assert_eq!(by_kind.id, registered.id);
        let by_canonical = svc.get_by_kind("acme:ns:Widget:1").await.unwrap().unwrap();
        assert_eq!(by_canonical.id, registered.id);
        let by_id = svc.get_schema("widget-schema").await.unwrap();
        assert_eq!(by_id.kind, "ns:Widget:1.0.0");
    }

    #[tokio::test]
    async fn upsert_keeps_created_time_and_replaces_body() {
        let svc = test_service().await;
        svc.register_schema(widget_registration()).await.unwrap();
        let first = svc.get_schema("ns:Widget:1.0.0").await.unwrap();

        let mut again = widget_registration();
        again.schema = json!({"type": "object", "required": ["name", "size"]});
        again.status = Some("DRAFT".into());
        svc.register_schema(again).await.unwrap();

        let second = svc.get_schema("ns:Widget:1.0.0").await.unwrap();
        assert_eq!(second.created_time, first.created_time);
        assert_eq!(second.status, SchemaStatus::Draft);
        assert_eq!(second.raw_schema["required"], json!(["name", "size"]));
        assert_eq!(svc.list_schemas().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn parent_kinds_round_trip() {
        let svc = test_service().await;
        svc.register_schema(SchemaRegistration {
            id: "child".into(),
            kind: "ns:Child:1.0.0".into(),
            status: None,
            schema: json!({"x-osdu-inheriting-from-kind": ["ns:Base:1.0.0", {"kind": "ns:Mixin:1"}]}),
            schema_info: None,
        })
        .await
        .unwrap();

        let doc = svc.get_schema("child").await.unwrap();
        assert_eq!(doc.parent_kinds, vec!["ns:Base:1.0.0", "ns:Mixin:1"]);
    }

    #[tokio::test]
    async fn registration_requires_object_schema() {
        let svc = test_service().await;
        let mut reg = widget_registration();
        reg.schema = json!("not a schema");
        let err = svc.register_schema(reg).await.unwrap_err();
        assert_eq!(err.code(), kindred_core::enums::ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn unknown_schema_is_not_found() {
        let svc = test_service().await;
        let err = svc.get_schema("ns:Ghost:1.0.0").await.unwrap_err();
        assert_eq!(err.code(), kindred_core::enums::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn registration_invalidates_resolution_cache() {
        let svc = test_service().await;
        svc.register_schema(widget_registration()).await.unwrap();
        let first = svc.resolve_schema("ns:Widget:1.0.0").await.unwrap();
        assert_eq!(first.merged_schema["required"], json!(["name"]));

        let mut again = widget_registration();
        again.schema = json!({"type": "object", "required": ["size"]});
        svc.register_schema(again).await.unwrap();

        let second = svc.resolve_schema("ns:Widget:1.0.0").await.unwrap();
        assert_eq!(second.merged_schema["required"], json!(["size"]));
    }
}
