//! Response shapes returned by the record store, batch coordinator and
//! operation surface.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::Record;
use crate::enums::{ErrorCode, SchemaStatus};

/// Result of a successful single-record ingest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct IngestOutcome {
    pub id: String,
    pub version: u64,
}

/// Result of a successful patch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    pub id: String,
    pub status: String,
    pub version: u64,
    pub updated_fields: Vec<String>,
}

impl PatchOutcome {
    #[must_use]
    pub fn new(id: String, version: u64, updated_fields: Vec<String>) -> Self {
        Self {
            id,
            status: "patched".to_string(),
            version,
            updated_fields,
        }
    }
}

/// Result of a successful soft delete.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub id: String,
    pub status: String,
}

impl DeleteOutcome {
    #[must_use]
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: "soft-deleted".to_string(),
        }
    }
}

/// Per-item failure inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ItemError {
    pub id: String,
    pub code: ErrorCode,
    pub reason: String,
}

/// Overall outcome of a batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every item succeeded (or the batch was empty).
    Complete,
    /// At least one success and at least one failure.
    Partial,
    /// No successes and at least one failure.
    Failed,
}

impl BatchStatus {
    /// Partial success is success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Complete | Self::Partial)
    }
}

/// Aggregated per-item report for list-shaped writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub record_count: usize,
    pub record_ids: Vec<String>,
    pub record_errors: Vec<ItemError>,
}

impl BatchReport {
    pub fn succeeded(&mut self, id: String) {
        self.record_count += 1;
        self.record_ids.push(id);
    }

    pub fn failed(&mut self, id: String, code: ErrorCode, reason: String) {
        self.record_errors.push(ItemError { id, code, reason });
    }

    #[must_use]
    pub fn status(&self) -> BatchStatus {
        match (self.record_count, self.record_errors.is_empty()) {
            (_, true) => BatchStatus::Complete,
            (0, false) => BatchStatus::Failed,
            _ => BatchStatus::Partial,
        }
    }
}

/// Records found plus the requested ids that were not visible.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    pub records: Vec<Record>,
    pub missing_record_ids: Vec<String>,
}

/// Result of a schema registration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SchemaRegistered {
    pub id: String,
    pub kind: String,
    pub status: SchemaStatus,
}

/// Distinct kinds of visible records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct KindsResponse {
    pub kinds: Vec<String>,
}

/// A page of flattened records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FlatRecordsResponse {
    pub records: Vec<Map<String, Value>>,
    pub limit: u32,
    pub offset: u32,
}
