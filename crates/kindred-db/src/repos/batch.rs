//! Batch coordinator.
//!
//! Items run in input order, each through the single-item operation and so
//! each in its own transaction. One item's failure never affects another.

use kindred_core::enums::ErrorCode;
use kindred_core::MISSING_ID;
use kindred_core::requests::{RecordInput, RecordPatch, item_id};
use kindred_core::responses::{BatchReport, RetrieveResponse};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::RecordError;
use crate::service::KindredService;

impl KindredService {
    /// Ingest each item independently.
    ///
    /// Items that fail the required-field check are reported under their id,
    /// or `<missing>` when no id can be read.
    pub async fn ingest_batch(&self, items: &[Value]) -> BatchReport {
        let mut report = BatchReport::default();
        for item in items {
            let label = item_id(item).unwrap_or_else(|| MISSING_ID.to_string());
            let result = match RecordInput::from_value(item) {
                Ok(input) => self.ingest(input).await,
                Err(e) => Err(RecordError::from(e)),
            };
            match result {
                Ok(outcome) => report.succeeded(outcome.id),
                Err(e) => record_failure(&mut report, "ingest", label, &e),
            }
        }
        log_report("ingest", &report);
        report
    }

    /// Patch each item independently. Every item must carry its own `id`.
    pub async fn patch_bulk(&self, items: &[Value]) -> BatchReport {
        let mut report = BatchReport::default();
        for item in items {
            let Some(id) = item_id(item) else {
                let err = RecordError::MissingField("id".to_string());
                record_failure(&mut report, "patch", MISSING_ID.to_string(), &err);
                continue;
            };
            let result = match RecordPatch::from_value(item) {
                Ok(patch) => self.patch(&id, patch).await,
                Err(e) => Err(RecordError::from(e)),
            };
            match result {
                Ok(outcome) => report.succeeded(outcome.id),
                Err(e) => record_failure(&mut report, "patch", id, &e),
            }
        }
        log_report("patch", &report);
        report
    }

    /// Soft-delete each id independently. Blank ids are validation failures.
    pub async fn delete_bulk(&self, ids: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        for id in ids {
            let id = id.trim();
            if id.is_empty() {
                let err = RecordError::MissingField("id".to_string());
                record_failure(&mut report, "delete", MISSING_ID.to_string(), &err);
                continue;
            }
            match self.soft_delete(id).await {
                Ok(outcome) => report.succeeded(outcome.id),
                Err(e) => record_failure(&mut report, "delete", id.to_string(), &e),
            }
        }
        log_report("delete", &report);
        report
    }

    /// Bulk read; see [`KindredService::retrieve`].
    ///
    /// # Errors
    ///
    /// `RecordError::Storage` if the underlying queries fail.
    pub async fn retrieve_bulk(
        &self,
        ids: &[String],
        include_deleted: bool,
        latest_only: bool,
    ) -> Result<RetrieveResponse, RecordError> {
        self.retrieve(ids, include_deleted, latest_only).await
    }
}

fn record_failure(report: &mut BatchReport, op: &str, id: String, err: &RecordError) {
    warn!(op, id = %id, code = %err.code(), error = %err, "batch item failed");
    report.failed(id, err.code(), err.to_string());
}

fn log_report(op: &str, report: &BatchReport) {
    info!(
        op,
        succeeded = report.record_count,
        failed = report.record_errors.len(),
        status = ?report.status(),
        "batch finished"
    );
}

/// The code a whole batch surfaces when nothing was committed.
#[must_use]
pub fn batch_failure_code(report: &BatchReport) -> Option<ErrorCode> {
    (!report.status().is_success()).then_some(ErrorCode::NoRecordsCommitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{widget, widget_service, widget_value};
    use kindred_core::responses::BatchStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn mixed_ingest_batch_is_partial() {
        let svc = widget_service().await;
        let items = vec![
            widget_value("a", json!({"name": "A"})),
            widget_value("b", json!({"name": 7})),
            json!({"kind": "ns:Widget:1.0.0"}),
            widget_value("c", json!({"name": "C"})),
        ];

        let report = svc.ingest_batch(&items).await;
        assert_eq!(report.record_count, 2);
        assert_eq!(report.record_ids, vec!["a", "c"]);
        assert_eq!(report.status(), BatchStatus::Partial);
        assert_eq!(batch_failure_code(&report), None);

        let codes: Vec<(&str, ErrorCode)> = report
            .record_errors
            .iter()
            .map(|e| (e.id.as_str(), e.code))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("b", ErrorCode::SchemaValidationError),
                (MISSING_ID, ErrorCode::ValidationError),
            ]
        );
    }

    #[tokio::test]
    async fn all_failed_batch_has_no_committed_records() {
        let svc = widget_service().await;
        let report = svc.ingest_batch(&[json!("not an object"), json!({})]).await;
        assert_eq!(report.status(), BatchStatus::Failed);
        assert_eq!(batch_failure_code(&report), Some(ErrorCode::NoRecordsCommitted));
        assert!(svc.list_kinds().await.unwrap().kinds.is_empty());
    }

    #[tokio::test]
    async fn patch_bulk_reports_per_item() {
        let svc = widget_service().await;
        svc.ingest(widget("a", json!({"name": "A"}))).await.unwrap();

        let report = svc
            .patch_bulk(&[
                json!({"id": "a", "data": {"size": 3}}),
                json!({"id": "ghost", "data": {"size": 3}}),
                json!({"data": {"size": 3}}),
                json!({"id": "a"}),
            ])
            .await;
        assert_eq!(report.record_ids, vec!["a"]);
        let codes: Vec<ErrorCode> = report.record_errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::NotFound,
                ErrorCode::ValidationError,
                ErrorCode::ValidationError,
            ]
        );
        assert_eq!(report.record_errors[1].reason, "Missing required field: id");
        assert_eq!(svc.get_by_id("a", false).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn delete_bulk_reports_already_deleted() {
        let svc = widget_service().await;
        svc.ingest(widget("a", json!({"name": "A"}))).await.unwrap();

        let ids: Vec<String> = ["a", "a", "nope"].map(String::from).to_vec();
        let report = svc.delete_bulk(&ids).await;
        assert_eq!(report.record_ids, vec!["a"]);
        let codes: Vec<ErrorCode> = report.record_errors.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![ErrorCode::AlreadyDeleted, ErrorCode::NotFound]);
    }

    #[tokio::test]
    async fn retrieve_bulk_matches_retrieve() {
        let svc = widget_service().await;
        svc.ingest(widget("a", json!({"name": "A"}))).await.unwrap();
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            svc.retrieve_bulk(&ids, false, true).await.unwrap(),
            svc.retrieve(&ids, false, true).await.unwrap()
        );
    }
}
