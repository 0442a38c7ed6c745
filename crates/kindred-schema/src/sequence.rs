//! Ingestion sequences.
//!
//! An `IngestionSequence.json` file lists reference-data manifests in load
//! order as `{FileName, Key, kind}` entries. File names are resolved against
//! the directory holding the sequence file. Before records are checked or
//! stored, each one receives default `acl`/`legal` blocks and, when it has
//! no id, a synthetic `osdu:reference-data--{kind}:{key}` id.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::error::SchemaError;
use crate::preflight::{PreflightReport, manifest_records, preflight};
use crate::resolver::SchemaResolver;
use crate::source::SchemaSource;

/// Repository-relative prefix stripped from sequence file names.
pub const MANIFEST_PREFIX: &str = "ReferenceValues/Manifests/reference-data/";

/// One manifest in an ingestion sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntry {
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "Key")]
    pub key: String,
    pub kind: String,
}

impl SequenceEntry {
    #[must_use]
    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        let name = self
            .file_name
            .strip_prefix(MANIFEST_PREFIX)
            .unwrap_or(&self.file_name);
        root.join(name)
    }

    /// Id given to records of this manifest that carry none.
    #[must_use]
    pub fn synthetic_id(&self) -> String {
        format!("osdu:reference-data--{}:{}", self.kind, self.key)
    }
}

/// A parsed sequence file and the directory its manifests live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionSequence {
    pub root: PathBuf,
    pub entries: Vec<SequenceEntry>,
}

impl IngestionSequence {
    /// Read a sequence file.
    ///
    /// # Errors
    ///
    /// `SchemaError::Source` if the file cannot be read or is not a list of
    /// sequence entries.
    pub fn read(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::Source(format!("cannot read {}: {e}", path.display())))?;
        let entries = serde_json::from_str(&text).map_err(|e| {
            SchemaError::Source(format!("invalid ingestion sequence {}: {e}", path.display()))
        })?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { root, entries })
    }
}

/// Blocks filled into records that lack them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDefaults {
    pub acl: Map<String, Value>,
    pub legal: Map<String, Value>,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        let object = |value: Value| match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            acl: object(json!({
                "viewers": ["data.default.viewers@opendes.example.com"],
                "owners": ["data.default.owners@opendes.example.com"]
            })),
            legal: object(json!({
                "legaltags": ["opendes-public-usa-dataset-1"],
                "otherRelevantDataCountries": ["US"]
            })),
        }
    }
}

impl RecordDefaults {
    /// Fill a missing `id`, `acl` and `legal`. Present values are kept, and
    /// non-object records are left for preflight to reject.
    pub fn fill(&self, record: &mut Value, entry: &SequenceEntry) {
        let Value::Object(map) = record else {
            return;
        };
        map.entry("id")
            .or_insert_with(|| Value::String(entry.synthetic_id()));
        map.entry("acl")
            .or_insert_with(|| Value::Object(self.acl.clone()));
        map.entry("legal")
            .or_insert_with(|| Value::Object(self.legal.clone()));
    }
}

/// How one manifest of a sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManifestState {
    /// Every record was stored.
    Success,
    /// Some records were stored, some were rejected.
    PartialFail,
    /// No record was stored.
    Fail,
    /// Every record passed preflight; nothing was stored.
    Validated,
    /// Records passed preflight and storing was skipped on request.
    DryRun,
    /// The manifest holds no records.
    EmptyPayload,
    MissingFile,
    BadFormat,
    ValidationFail,
}

impl ManifestState {
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::PartialFail | Self::Fail | Self::MissingFile | Self::BadFormat | Self::ValidationFail
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestOutcome {
    pub key: String,
    pub kind: String,
    pub file: PathBuf,
    pub state: ManifestState,
    pub records: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ManifestOutcome {
    #[must_use]
    pub fn new(entry: &SequenceEntry, file: PathBuf, state: ManifestState) -> Self {
        Self {
            key: entry.key.clone(),
            kind: entry.kind.clone(),
            file,
            state,
            records: 0,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_records(mut self, records: usize) -> Self {
        self.records = records;
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

/// Per-manifest results of a sequence run, with totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceSummary {
    pub total: usize,
    pub succeeded: usize,
    pub dry_run: usize,
    pub failed: usize,
    pub manifests: Vec<ManifestOutcome>,
}

impl SequenceSummary {
    pub fn push(&mut self, outcome: ManifestOutcome) {
        self.total += 1;
        match outcome.state {
            ManifestState::Success | ManifestState::Validated => self.succeeded += 1,
            ManifestState::DryRun => self.dry_run += 1,
            state if state.is_failure() => {
                self.failed += 1;
                warn!(key = %outcome.key, kind = %outcome.kind, ?state, "manifest failed");
            }
            _ => {}
        }
        self.manifests.push(outcome);
    }

    #[must_use]
    pub const fn passed(&self) -> bool {
        self.failed == 0
    }

    /// Log the totals once a run is over.
    pub fn log_totals(&self) {
        info!(
            total = self.total,
            succeeded = self.succeeded,
            dry_run = self.dry_run,
            failed = self.failed,
            "ingestion sequence finished"
        );
    }
}

/// Load one manifest's records and fill their defaults.
///
/// # Errors
///
/// The finished outcome when the manifest is missing, malformed or empty.
pub fn load_manifest(
    entry: &SequenceEntry,
    root: &Path,
    defaults: &RecordDefaults,
) -> Result<Vec<Value>, ManifestOutcome> {
    let file = entry.manifest_path(root);
    if !file.is_file() {
        return Err(ManifestOutcome::new(entry, file, ManifestState::MissingFile));
    }

    let parsed = std::fs::read_to_string(&file)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()))
        .and_then(|manifest| manifest_records(manifest).map_err(|e| e.to_string()));
    let mut records = match parsed {
        Ok(records) => records,
        Err(reason) => {
            return Err(ManifestOutcome::new(entry, file, ManifestState::BadFormat)
                .with_errors(vec![reason]));
        }
    };
    if records.is_empty() {
        return Err(ManifestOutcome::new(entry, file, ManifestState::EmptyPayload));
    }

    for record in &mut records {
        defaults.fill(record, entry);
    }
    Ok(records)
}

/// Preflight issues as `Record {index} (ID: {id}): {reason}` lines.
#[must_use]
pub fn issue_lines(report: &PreflightReport) -> Vec<String> {
    report
        .issues
        .iter()
        .map(|issue| format!("Record {} (ID: {}): {}", issue.index, issue.id, issue.reason))
        .collect()
}

/// Preflight every manifest of a sequence without storing anything.
pub async fn validate_sequence<S: SchemaSource>(
    resolver: &SchemaResolver,
    source: &S,
    sequence: &IngestionSequence,
    defaults: &RecordDefaults,
) -> SequenceSummary {
    let mut summary = SequenceSummary::default();
    for entry in &sequence.entries {
        let records = match load_manifest(entry, &sequence.root, defaults) {
            Ok(records) => records,
            Err(outcome) => {
                summary.push(outcome);
                continue;
            }
        };

        let report = preflight(resolver, source, &records).await;
        let file = entry.manifest_path(&sequence.root);
        let outcome = if report.passed() {
            ManifestOutcome::new(entry, file, ManifestState::Validated)
        } else {
            ManifestOutcome::new(entry, file, ManifestState::ValidationFail)
                .with_errors(issue_lines(&report))
        };
        summary.push(outcome.with_records(records.len()));
    }
    summary.log_totals();
    summary
}
