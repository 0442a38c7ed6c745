//! JSONL trail operation envelope.
//!
//! Every committed mutation is recorded as a `TrailOperation` in per-day
//! `{trail_dir}/{YYYY-MM-DD}.jsonl` files.
//!
//! Old trail lines without a `v` field deserialize with `v == 1`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{EntityType, TrailOp};

const fn default_trail_version() -> u32 {
    1
}

/// A single operation recorded in the JSONL trail.
///
/// `data` carries the full record for ingest, the merged record for patch,
/// and the raw document for schema registration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TrailOperation {
    /// Envelope version. Defaults to 1 for lines without this field.
    #[serde(default = "default_trail_version")]
    pub v: u32,

    /// RFC 3339 timestamp of the operation.
    pub ts: String,

    pub op: TrailOp,

    pub entity: EntityType,

    /// ID of the affected record or schema.
    pub id: String,

    /// Record version after the mutation. Absent for schema operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,

    pub data: serde_json::Value,
}
