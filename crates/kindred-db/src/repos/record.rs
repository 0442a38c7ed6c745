//! Record repository: ingest, patch, soft delete, retrieval.
//!
//! Every write is optimistic: the row is updated only if its version still
//! equals the version read inside the same transaction. Each successful
//! ingest or patch also appends an immutable snapshot to `record_versions`.

use std::collections::{HashMap, HashSet};

use kindred_core::entities::Record;
use kindred_core::enums::{EntityType, TrailOp};
use kindred_core::requests::{RecordInput, RecordPatch};
use kindred_core::responses::{
    DeleteOutcome, FlatRecordsResponse, IngestOutcome, KindsResponse, PatchOutcome,
    RetrieveResponse,
};
use kindred_core::trail::TrailOperation;
use serde_json::Value;
use tracing::info;

use crate::error::{DatabaseError, RecordError};
use crate::helpers::{
    format_datetime, get_opt_string, now, parse_datetime, parse_json_object,
    parse_optional_datetime, to_json_text, version_from_db, version_to_db,
};
use crate::service::KindredService;

const RECORD_COLUMNS: &str = "id, kind, acl, legal, data, version, deleted, deleted_at, \
     create_user, create_time, modify_user, modify_time";

/// History rows decode with the same layout; snapshots are never deleted.
const VERSION_COLUMNS: &str = "id, kind, acl, legal, data, version, 0, NULL, \
     create_user, create_time, modify_user, modify_time";

fn row_to_record(row: &libsql::Row) -> Result<Record, DatabaseError> {
    Ok(Record {
        id: row.get::<String>(0)?,
        kind: row.get::<String>(1)?,
        acl: parse_json_object("acl", &row.get::<String>(2)?)?,
        legal: parse_json_object("legal", &row.get::<String>(3)?)?,
        data: parse_json_object("data", &row.get::<String>(4)?)?,
        version: version_from_db(row.get::<i64>(5)?)?,
        deleted: row.get::<i64>(6)? != 0,
        deleted_at: parse_optional_datetime(get_opt_string(row, 7)?.as_deref())?,
        create_user: row.get::<String>(8)?,
        create_time: parse_datetime(&row.get::<String>(9)?)?,
        modify_user: row.get::<String>(10)?,
        modify_time: parse_datetime(&row.get::<String>(11)?)?,
    })
}

impl KindredService {
    pub(crate) async fn fetch_record(&self, id: &str) -> Result<Option<Record>, DatabaseError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1");
        let mut rows = self.db().conn().query(&sql, [id]).await?;
        match rows.next().await? {
            Some(row) => row_to_record(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_records(&self, ids: &[&str]) -> Result<HashMap<String, Record>, DatabaseError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE id IN ({})",
            placeholders.join(", ")
        );
        let params: Vec<libsql::Value> = ids
            .iter()
            .map(|id| libsql::Value::Text((*id).to_string()))
            .collect();
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;

        let mut found = HashMap::with_capacity(ids.len());
        while let Some(row) = rows.next().await? {
            let record = row_to_record(&row)?;
            found.insert(record.id.clone(), record);
        }
        Ok(found)
    }

    /// Snapshots of `id` older than `below`, ascending.
    async fn history(&self, id: &str, below: u64) -> Result<Vec<Record>, DatabaseError> {
        let sql = format!(
            "SELECT {VERSION_COLUMNS} FROM record_versions WHERE id = ?1 AND version < ?2 ORDER BY version ASC"
        );
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params![id, version_to_db(below)?])
            .await?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next().await? {
            versions.push(row_to_record(&row)?);
        }
        Ok(versions)
    }

    async fn insert_record(&self, record: &Record) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO records ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                libsql::params![
                    record.id.as_str(),
                    record.kind.as_str(),
                    to_json_text(&record.acl)?,
                    to_json_text(&record.legal)?,
                    to_json_text(&record.data)?,
                    version_to_db(record.version)?,
                    i64::from(record.deleted),
                    record.deleted_at.as_ref().map(format_datetime),
                    record.create_user.as_str(),
                    format_datetime(&record.create_time),
                    record.modify_user.as_str(),
                    format_datetime(&record.modify_time),
                ],
            )
            .await?;
        Ok(())
    }

    /// Write `record` over the row, provided the row is still at `read_version`.
    async fn update_record(&self, record: &Record, read_version: u64) -> Result<(), RecordError> {
        let affected = self
            .db()
            .conn()
            .execute(
                "UPDATE records SET kind = ?1, acl = ?2, legal = ?3, data = ?4, version = ?5,
                    deleted = ?6, deleted_at = ?7, modify_user = ?8, modify_time = ?9
                 WHERE id = ?10 AND version = ?11",
                libsql::params![
                    record.kind.as_str(),
                    to_json_text(&record.acl)?,
                    to_json_text(&record.legal)?,
                    to_json_text(&record.data)?,
                    version_to_db(record.version)?,
                    i64::from(record.deleted),
                    record.deleted_at.as_ref().map(format_datetime),
                    record.modify_user.as_str(),
                    format_datetime(&record.modify_time),
                    record.id.as_str(),
                    version_to_db(read_version)?,
                ],
            )
            .await?;

        if affected == 0 {
            return Err(RecordError::VersionConflict {
                id: record.id.clone(),
                expected: read_version,
            });
        }
        Ok(())
    }

    async fn append_version(&self, record: &Record) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO record_versions (id, version, kind, acl, legal, data,
                    create_user, create_time, modify_user, modify_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                libsql::params![
                    record.id.as_str(),
                    version_to_db(record.version)?,
                    record.kind.as_str(),
                    to_json_text(&record.acl)?,
                    to_json_text(&record.legal)?,
                    to_json_text(&record.data)?,
                    record.create_user.as_str(),
                    format_datetime(&record.create_time),
                    record.modify_user.as_str(),
                    format_datetime(&record.modify_time),
                ],
            )
            .await?;
        Ok(())
    }

    fn trail_record(&self, op: TrailOp, record: &Record) -> Result<(), DatabaseError> {
        self.trail().append_validated(
            &TrailOperation {
                v: 1,
                ts: format_datetime(&record.modify_time),
                op,
                entity: EntityType::Record,
                id: record.id.clone(),
                version: Some(record.version),
                data: serde_json::to_value(record).map_err(|e| DatabaseError::Other(e.into()))?,
            },
            self.builtins(),
        )
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a record at version 1, or replace an existing one at N+1.
    ///
    /// Replacing a soft-deleted record brings it back. Create stamps survive.
    ///
    /// # Errors
    ///
    /// `RecordError::Schema` when the kind cannot be resolved or `data` does
    /// not validate, `RecordError::VersionConflict` when the row moved
    /// underneath, `RecordError::Storage` on database failure.
    pub async fn ingest(&self, input: RecordInput) -> Result<IngestOutcome, RecordError> {
        let _guard = self.lock().await;
        let schema = self.resolver().resolve(self, &input.kind).await?;
        kindred_schema::validate(&schema, &Value::Object(input.data.clone()))?;

        self.db().begin().await?;
        let result = self.write_ingest(input).await;
        let outcome = self.finish(result).await?;
        info!(id = %outcome.id, version = outcome.version, "record ingested");
        Ok(outcome)
    }

    async fn write_ingest(&self, input: RecordInput) -> Result<IngestOutcome, RecordError> {
        let now = now();
        let actor = self.actor().to_string();

        let record = match self.fetch_record(&input.id).await? {
            None => {
                let record = Record {
                    id: input.id,
                    kind: input.kind,
                    acl: input.acl,
                    legal: input.legal,
                    data: input.data,
                    version: 1,
                    deleted: false,
                    deleted_at: None,
                    create_user: actor.clone(),
                    create_time: now,
                    modify_user: actor,
                    modify_time: now,
                };
                self.insert_record(&record).await?;
                record
            }
            Some(current) => {
                let record = Record {
                    id: input.id,
                    kind: input.kind,
                    acl: input.acl,
                    legal: input.legal,
                    data: input.data,
                    version: current.version + 1,
                    deleted: false,
                    deleted_at: None,
                    create_user: current.create_user,
                    create_time: current.create_time,
                    modify_user: actor,
                    modify_time: now,
                };
                self.update_record(&record, current.version).await?;
                record
            }
        };

        self.append_version(&record).await?;
        self.trail_record(TrailOp::Ingest, &record)?;
        Ok(IngestOutcome {
            id: record.id,
            version: record.version,
        })
    }

    /// Merge `patch` into a live record, re-validate, and bump its version.
    ///
    /// `data`, `acl` and `legal` merge one level deep; `kind` is replaced.
    ///
    /// # Errors
    ///
    /// `RecordError::EmptyPatch`, `NotFound`, `AlreadyDeleted`,
    /// `VersionConflict` (including a stale `expectedVersion`), `Schema`, or
    /// `Storage`. The stored row is unchanged on any error.
    pub async fn patch(&self, id: &str, patch: RecordPatch) -> Result<PatchOutcome, RecordError> {
        if patch.is_empty() {
            return Err(RecordError::EmptyPatch);
        }
        let _guard = self.lock().await;

        self.db().begin().await?;
        let result = self.write_patch(id, patch).await;
        let outcome = self.finish(result).await?;
        info!(id = %outcome.id, version = outcome.version, fields = ?outcome.updated_fields, "record patched");
        Ok(outcome)
    }

    async fn write_patch(&self, id: &str, patch: RecordPatch) -> Result<PatchOutcome, RecordError> {
        let current = self
            .fetch_record(id)
            .await?
            .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
        if current.deleted {
            return Err(RecordError::AlreadyDeleted(id.to_string()));
        }
        if let Some(expected) = patch.expected_version {
            if expected != current.version {
                return Err(RecordError::VersionConflict {
                    id: id.to_string(),
                    expected,
                });
            }
        }

        let updated_fields = patch.updated_fields();
        let mut next = current.clone();
        if let Some(kind) = patch.kind {
            next.kind = kind;
        }
        if let Some(acl) = patch.acl {
            next.acl.extend(acl);
        }
        if let Some(legal) = patch.legal {
            next.legal.extend(legal);
        }
        if let Some(data) = patch.data {
            next.data.extend(data);
        }

        let schema = self.resolver().resolve(self, &next.kind).await?;
        kindred_schema::validate(&schema, &Value::Object(next.data.clone()))?;

        next.version = current.version + 1;
        next.modify_user = self.actor().to_string();
        next.modify_time = now();
        self.update_record(&next, current.version).await?;
        self.append_version(&next).await?;
        self.trail_record(TrailOp::Patch, &next)?;

        Ok(PatchOutcome::new(next.id, next.version, updated_fields))
    }

    /// Mark a record deleted. The version does not change.
    ///
    /// # Errors
    ///
    /// `RecordError::NotFound`, `AlreadyDeleted`, `VersionConflict` or `Storage`.
    pub async fn soft_delete(&self, id: &str) -> Result<DeleteOutcome, RecordError> {
        let _guard = self.lock().await;

        self.db().begin().await?;
        let result = self.write_delete(id).await;
        let outcome = self.finish(result).await?;
        info!(id = %outcome.id, "record soft-deleted");
        Ok(outcome)
    }

    async fn write_delete(&self, id: &str) -> Result<DeleteOutcome, RecordError> {
        let current = self
            .fetch_record(id)
            .await?
            .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
        if current.deleted {
            return Err(RecordError::AlreadyDeleted(id.to_string()));
        }

        let now = now();
        let mut next = current.clone();
        next.deleted = true;
        next.deleted_at = Some(now);
        next.modify_user = self.actor().to_string();
        next.modify_time = now;
        self.update_record(&next, current.version).await?;
        self.trail_record(TrailOp::Delete, &next)?;

        Ok(DeleteOutcome::new(next.id))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Fetch records by id.
    ///
    /// Ids are de-duplicated and answered in input order. Deleted records
    /// count as missing unless `include_deleted`. With `latest_only == false`
    /// every stored version of a found record is returned, oldest first.
    ///
    /// # Errors
    ///
    /// `RecordError::Storage` if a query or row decode fails.
    pub async fn retrieve(
        &self,
        ids: &[String],
        include_deleted: bool,
        latest_only: bool,
    ) -> Result<RetrieveResponse, RecordError> {
        let _guard = self.lock().await;

        let mut seen = HashSet::new();
        let unique: Vec<&str> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .collect();

        let current = self.fetch_records(&unique).await?;
        let mut response = RetrieveResponse::default();
        for id in unique {
            match current.get(id) {
                Some(record) if include_deleted || !record.deleted => {
                    if !latest_only {
                        response.records.extend(self.history(id, record.version).await?);
                    }
                    response.records.push(record.clone());
                }
                _ => response.missing_record_ids.push(id.to_string()),
            }
        }
        Ok(response)
    }

    /// A single visible record. The id is trimmed like in [`Self::retrieve`].
    ///
    /// # Errors
    ///
    /// `RecordError::NotFound` when absent, or deleted and not `include_deleted`.
    pub async fn get_by_id(&self, id: &str, include_deleted: bool) -> Result<Record, RecordError> {
        let _guard = self.lock().await;
        let id = id.trim();
        match self.fetch_record(id).await? {
            Some(record) if include_deleted || !record.deleted => Ok(record),
            _ => Err(RecordError::NotFound(id.to_string())),
        }
    }

    /// Latest version of each requested record.
    ///
    /// # Errors
    ///
    /// Same as [`Self::retrieve`].
    pub async fn get_by_ids(
        &self,
        ids: &[String],
        include_deleted: bool,
    ) -> Result<RetrieveResponse, RecordError> {
        self.retrieve(ids, include_deleted, true).await
    }

    /// Distinct kinds of live records, sorted.
    ///
    /// # Errors
    ///
    /// `RecordError::Storage` if the query fails.
    pub async fn list_kinds(&self) -> Result<KindsResponse, RecordError> {
        let _guard = self.lock().await;
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT DISTINCT kind FROM records WHERE deleted = 0 ORDER BY kind ASC",
                (),
            )
            .await?;
        let mut kinds = Vec::new();
        while let Some(row) = rows.next().await? {
            kinds.push(row.get::<String>(0)?);
        }
        Ok(KindsResponse { kinds })
    }

    /// Live records with their `data` keys lifted beside the envelope fields.
    ///
    /// # Errors
    ///
    /// `RecordError::Storage` if the query or row decode fails.
    pub async fn flattened_records(
        &self,
        kind: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<FlatRecordsResponse, RecordError> {
        let _guard = self.lock().await;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records
             WHERE deleted = 0 AND (?1 IS NULL OR kind = ?1)
             ORDER BY id ASC LIMIT ?2 OFFSET ?3"
        );
        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params![kind, i64::from(limit), i64::from(offset)])
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?.flattened());
        }
        Ok(FlatRecordsResponse {
            records,
            limit,
            offset,
        })
    }
}
