//! JSONL trail writer.
//!
//! Appends `TrailOperation` records to per-day `{trail_dir}/{YYYY-MM-DD}.jsonl`
//! files. Uses `serde_jsonlines::append_json_lines` for per-line appends.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use kindred_core::enums::EntityType;
use kindred_core::trail::TrailOperation;
use kindred_schema::BuiltinSchemas;

use crate::error::DatabaseError;

/// Appends trail operations to per-day JSONL files.
///
/// Every mutation in `KindredService` calls `append_validated()` before
/// committing its transaction; a failed append rolls the mutation back.
pub struct TrailWriter {
    trail_dir: PathBuf,
    enabled: bool,
}

impl TrailWriter {
    /// Create a new `TrailWriter` pointing at the given directory.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created.
    pub fn new(trail_dir: PathBuf) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(&trail_dir).map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(Self {
            trail_dir,
            enabled: true,
        })
    }

    /// Create a disabled writer.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            trail_dir: PathBuf::new(),
            enabled: false,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append a trail operation to the file for the operation's day.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the file write fails.
    pub fn append(&self, op: &TrailOperation) -> Result<(), DatabaseError> {
        if !self.enabled {
            return Ok(());
        }

        let path = self.file_for(&op.ts);
        serde_jsonlines::append_json_lines(&path, [op])
            .map_err(|e| DatabaseError::Other(e.into()))?;
        Ok(())
    }

    /// Append with validation of `data` against the built-in envelope schema.
    ///
    /// Validation is warn-only: a line that does not match is still written.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the file write fails.
    pub fn append_validated(
        &self,
        op: &TrailOperation,
        builtins: &BuiltinSchemas,
    ) -> Result<(), DatabaseError> {
        if !self.enabled {
            return Ok(());
        }

        if let Err(e) = builtins.validate(entity_schema_name(op.entity), &op.data) {
            tracing::warn!(entity = ?op.entity, id = %op.id, error = %e, "trail payload does not match its envelope schema");
        }

        self.append(op)
    }

    /// The directory where trail files are stored.
    #[must_use]
    pub fn trail_dir(&self) -> &Path {
        &self.trail_dir
    }

    /// `{trail_dir}/{YYYY-MM-DD}.jsonl` for an RFC 3339 timestamp. Falls back
    /// to today when the timestamp does not parse.
    fn file_for(&self, ts: &str) -> PathBuf {
        let day = DateTime::parse_from_rfc3339(ts)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
            .format("%Y-%m-%d");
        self.trail_dir.join(format!("{day}.jsonl"))
    }
}

const fn entity_schema_name(entity: EntityType) -> &'static str {
    match entity {
        EntityType::Record => "record",
        EntityType::Schema => "schema_document",
    }
}
