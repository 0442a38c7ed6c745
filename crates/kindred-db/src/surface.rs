//! Inbound operation surface.
//!
//! Transport-neutral request handling: each [`Request`] is checked for a
//! partition, dispatched to the store, and answered with an [`ApiReply`]
//! carrying an HTTP-style status and a JSON body.

use std::sync::Arc;

use kindred_core::enums::ErrorCode;
use kindred_core::partition::PartitionId;
use kindred_core::requests::{RecordPatch, SchemaRegistration};
use kindred_core::responses::BatchReport;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::RecordError;
use crate::repos::batch::batch_failure_code;
use crate::service::KindredService;

const MISSING_PARTITION: &str = "Missing required header: data-partition-id";
const BATCH_FAILED: &str = "All records failed validation or DB insert";

/// Reply status, numerically aligned with HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    Created,
    BadRequest,
    NotFound,
    Conflict,
    InternalError,
}

impl ReplyStatus {
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InternalError => 500,
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Created)
    }

    /// Status for a failed single-item operation.
    #[must_use]
    pub const fn for_error(code: ErrorCode) -> Self {
        match code {
            ErrorCode::SchemaServiceError | ErrorCode::DbError => Self::InternalError,
            ErrorCode::NotFound => Self::NotFound,
            ErrorCode::VersionConflict => Self::Conflict,
            ErrorCode::ValidationError
            | ErrorCode::SchemaValidationError
            | ErrorCode::AlreadyDeleted
            | ErrorCode::NoRecordsCommitted => Self::BadRequest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: ReplyStatus,
    pub body: Value,
}

impl ApiReply {
    fn json<T: Serialize>(status: ReplyStatus, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(e) => Self::failure(ReplyStatus::InternalError, ErrorCode::DbError, &e.to_string()),
        }
    }

    fn failure(status: ReplyStatus, code: ErrorCode, reason: &str) -> Self {
        Self {
            status,
            body: json!({"error": code.as_str(), "reason": reason}),
        }
    }

    fn bad_request(reason: &str) -> Self {
        Self::failure(ReplyStatus::BadRequest, ErrorCode::ValidationError, reason)
    }

    fn from_error(err: &RecordError) -> Self {
        let code = err.code();
        Self::failure(ReplyStatus::for_error(code), code, &err.to_string())
    }

    /// A batch reply: `success` when anything committed, else 400 with the
    /// per-item errors.
    fn batch(success: ReplyStatus, report: &BatchReport) -> Self {
        match batch_failure_code(report) {
            None => Self::json(success, report),
            Some(code) => Self {
                status: ReplyStatus::BadRequest,
                body: json!({
                    "error": code.as_str(),
                    "reason": BATCH_FAILED,
                    "recordErrors": report.record_errors,
                }),
            },
        }
    }

    fn from_result<T: Serialize>(status: ReplyStatus, result: Result<T, RecordError>) -> Self {
        match result {
            Ok(value) => Self::json(status, &value),
            Err(e) => Self::from_error(&e),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Every operation the surface accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    PutRecords {
        records: Vec<Value>,
    },
    GetRecords {
        ids: Vec<String>,
        include_deleted: bool,
    },
    DeleteRecord {
        id: String,
    },
    PatchRecord {
        id: String,
        patch: Value,
    },
    BatchIngest {
        records: Vec<Value>,
    },
    BatchDelete {
        ids: Vec<String>,
    },
    BatchRetrieve {
        ids: Vec<String>,
        include_deleted: bool,
        latest_only: bool,
    },
    BatchPatch {
        patches: Vec<Value>,
    },
    RegisterSchema {
        body: Value,
    },
    GetSchema {
        reference: String,
        resolve: bool,
    },
    ListKinds,
    FlattenedRecords {
        kind: Option<String>,
        limit: Option<u32>,
        offset: u32,
    },
}

impl Request {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PutRecords { .. } => "put_records",
            Self::GetRecords { .. } => "get_records",
            Self::DeleteRecord { .. } => "delete_record",
            Self::PatchRecord { .. } => "patch_record",
            Self::BatchIngest { .. } => "batch_ingest",
            Self::BatchDelete { .. } => "batch_delete",
            Self::BatchRetrieve { .. } => "batch_retrieve",
            Self::BatchPatch { .. } => "batch_patch",
            Self::RegisterSchema { .. } => "register_schema",
            Self::GetSchema { .. } => "get_schema",
            Self::ListKinds => "list_kinds",
            Self::FlattenedRecords { .. } => "flattened_records",
        }
    }
}

fn no_ids(ids: &[String]) -> bool {
    ids.iter().all(|id| id.trim().is_empty())
}

impl KindredService {
    /// Answer one inbound request on behalf of `partition`.
    ///
    /// The partition is only checked for presence.
    pub async fn handle(&self, partition: Option<&str>, request: Request) -> ApiReply {
        let Ok(partition) = PartitionId::require(partition) else {
            return ApiReply {
                status: ReplyStatus::BadRequest,
                body: json!({"error": MISSING_PARTITION}),
            };
        };
        debug!(partition = %partition, op = request.name(), "handling request");

        match request {
            Request::PutRecords { records } | Request::BatchIngest { records } => {
                if records.is_empty() {
                    return ApiReply::bad_request("No records supplied");
                }
                ApiReply::batch(ReplyStatus::Created, &self.ingest_batch(&records).await)
            }
            Request::GetRecords {
                ids,
                include_deleted,
            } => {
                if no_ids(&ids) {
                    return ApiReply::bad_request("No record ids supplied");
                }
                ApiReply::from_result(ReplyStatus::Ok, self.get_by_ids(&ids, include_deleted).await)
            }
            Request::DeleteRecord { id } => {
                ApiReply::from_result(ReplyStatus::Ok, self.soft_delete(&id).await)
            }
            Request::PatchRecord { id, patch } => {
                let result = match RecordPatch::from_value(&patch) {
                    Ok(patch) => self.patch(&id, patch).await,
                    Err(e) => Err(e.into()),
                };
                ApiReply::from_result(ReplyStatus::Ok, result)
            }
            Request::BatchDelete { ids } => {
                if no_ids(&ids) {
                    return ApiReply::bad_request("No record ids supplied");
                }
                ApiReply::batch(ReplyStatus::Ok, &self.delete_bulk(&ids).await)
            }
            Request::BatchRetrieve {
                ids,
                include_deleted,
                latest_only,
            } => {
                if no_ids(&ids) {
                    return ApiReply::bad_request("No record ids supplied");
                }
                ApiReply::from_result(
                    ReplyStatus::Ok,
                    self.retrieve_bulk(&ids, include_deleted, latest_only).await,
                )
            }
            Request::BatchPatch { patches } => {
                if patches.is_empty() {
                    return ApiReply::bad_request("No patches supplied");
                }
                ApiReply::batch(ReplyStatus::Ok, &self.patch_bulk(&patches).await)
            }
            Request::RegisterSchema { body } => {
                let result = match SchemaRegistration::from_value(&body) {
                    Ok(registration) => self.register_schema(registration).await,
                    Err(e) => Err(e.into()),
                };
                ApiReply::from_result(ReplyStatus::Created, result)
            }
            Request::GetSchema { reference, resolve } => {
                if resolve {
                    let resolved = self.resolve_schema(&reference).await;
                    ApiReply::from_result(ReplyStatus::Ok, resolved.map(Arc::unwrap_or_clone))
                } else {
                    ApiReply::from_result(ReplyStatus::Ok, self.get_schema(&reference).await)
                }
            }
            Request::ListKinds => ApiReply::from_result(ReplyStatus::Ok, self.list_kinds().await),
            Request::FlattenedRecords {
                kind,
                limit,
                offset,
            } => {
                let limit = limit.unwrap_or_else(|| self.default_limit());
                ApiReply::from_result(
                    ReplyStatus::Ok,
                    self.flattened_records(kind.as_deref(), limit, offset).await,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{widget_registration, widget_service, widget_value};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const P: Option<&str> = Some("opendes");

    #[rstest]
    #[case(ErrorCode::ValidationError, 400)]
    #[case(ErrorCode::SchemaValidationError, 400)]
    #[case(ErrorCode::AlreadyDeleted, 400)]
    #[case(ErrorCode::NotFound, 404)]
    #[case(ErrorCode::VersionConflict, 409)]
    #[case(ErrorCode::SchemaServiceError, 500)]
    #[case(ErrorCode::DbError, 500)]
    fn error_codes_map_to_statuses(#[case] code: ErrorCode, #[case] status: u16) {
        assert_eq!(ReplyStatus::for_error(code).code(), status);
    }

    #[tokio::test]
    async fn missing_partition_is_rejected_first() {
        let svc = widget_service().await;
        for partition in [None, Some("  ")] {
            let reply = svc.handle(partition, Request::ListKinds).await;
            assert_eq!(reply.status, ReplyStatus::BadRequest);
            assert_eq!(reply.body, json!({"error": MISSING_PARTITION}));
        }
    }

    #[tokio::test]
    async fn put_records_created_then_get() {
        let svc = widget_service().await;
        let reply = svc
            .handle(
                P,
                Request::PutRecords {
                    records: vec![widget_value("w1", json!({"name": "Foo"}))],
                },
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::Created);
        assert_eq!(reply.body["recordCount"], 1);
        assert_eq!(reply.body["recordIds"], json!(["w1"]));

        let reply = svc
            .handle(
                P,
                Request::GetRecords {
                    ids: vec!["w1".into(), "w2".into()],
                    include_deleted: false,
                },
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::Ok);
        assert_eq!(reply.body["records"][0]["data"]["name"], "Foo");
        assert_eq!(reply.body["missingRecordIds"], json!(["w2"]));
    }

    #[tokio::test]
    async fn failed_batch_is_bad_request_with_item_errors() {
        let svc = widget_service().await;
        let reply = svc
            .handle(
                P,
                Request::BatchIngest {
                    records: vec![widget_value("w1", json!({"name": 1}))],
                },
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::BadRequest);
        assert_eq!(reply.body["error"], "NO_RECORDS_COMMITTED");
        assert_eq!(reply.body["reason"], BATCH_FAILED);
        assert_eq!(reply.body["recordErrors"][0]["code"], "SCHEMA_VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn empty_inputs_are_bad_requests() {
        let svc = widget_service().await;
        let requests = [
            Request::PutRecords { records: vec![] },
            Request::GetRecords {
                ids: vec![" ".into()],
                include_deleted: false,
            },
            Request::BatchDelete { ids: vec![] },
            Request::BatchRetrieve {
                ids: vec![],
                include_deleted: false,
                latest_only: true,
            },
            Request::BatchPatch { patches: vec![] },
            Request::PatchRecord {
                id: "w1".into(),
                patch: json!({}),
            },
        ];
        for request in requests {
            let name = request.name();
            let reply = svc.handle(P, request).await;
            assert_eq!(reply.status, ReplyStatus::BadRequest, "{name}");
            assert_eq!(reply.body["error"], "VALIDATION_ERROR", "{name}");
        }
    }

    #[tokio::test]
    async fn single_item_errors_map_status() {
        let svc = widget_service().await;
        let reply = svc
            .handle(P, Request::DeleteRecord { id: "ghost".into() })
            .await;
        assert_eq!(reply.status, ReplyStatus::NotFound);
        assert_eq!(reply.body["error"], "NOT_FOUND");

        svc.handle(
            P,
            Request::PutRecords {
                records: vec![widget_value("w1", json!({"name": "Foo"}))],
            },
        )
        .await;
        let reply = svc
            .handle(
                P,
                Request::PatchRecord {
                    id: "w1".into(),
                    patch: json!({"data": {"size": 2}, "expectedVersion": 9}),
                },
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::Conflict);

        let reply = svc
            .handle(
                P,
                Request::GetSchema {
                    reference: "ns:Missing:1.0.0".into(),
                    resolve: true,
                },
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::InternalError);
        assert_eq!(reply.body["error"], "SCHEMA_SERVICE_ERROR");
    }

    #[tokio::test]
    async fn schema_register_and_fetch() {
        let svc = widget_service().await;
        let mut registration = serde_json::to_value(widget_registration()).unwrap();
        registration["id"] = json!("widget-2");
        registration["kind"] = json!("ns:Widget:2.0.0");
        let reply = svc
            .handle(P, Request::RegisterSchema { body: registration })
            .await;
        assert_eq!(reply.status, ReplyStatus::Created);
        assert_eq!(reply.body["status"], "PUBLISHED");

        let reply = svc
            .handle(
                P,
                Request::GetSchema {
                    reference: "widget-2".into(),
                    resolve: false,
                },
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::Ok);
        assert_eq!(reply.body["kind"], "ns:Widget:2.0.0");

        let reply = svc
            .handle(
                P,
                Request::GetSchema {
                    reference: "ns:Widget:2.0.0".into(),
                    resolve: true,
                },
            )
            .await;
        assert_eq!(reply.body["mergedSchema"]["required"], json!(["name"]));
    }

    #[tokio::test]
    async fn flattened_records_use_default_limit() {
        let svc = widget_service().await.with_default_limit(7);
        let reply = svc
            .handle(
                P,
                Request::FlattenedRecords {
                    kind: None,
                    limit: None,
                    offset: 0,
                },
            )
            .await;
        assert_eq!(reply.status, ReplyStatus::Ok);
        assert_eq!(reply.body["limit"], 7);
    }
}
