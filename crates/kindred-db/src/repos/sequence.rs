//! Sequence-driven reference-data ingestion.
//!
//! Each manifest is loaded, filled with defaults and preflighted as a whole.
//! A manifest with any preflight issue is skipped entirely; otherwise its
//! records go through the batch coordinator.

use kindred_core::responses::{BatchReport, BatchStatus};
use kindred_schema::preflight::preflight;
use kindred_schema::sequence::{
    IngestionSequence, ManifestOutcome, ManifestState, RecordDefaults, SequenceSummary,
    issue_lines, load_manifest,
};
use tracing::info;

use crate::service::KindredService;

impl KindredService {
    /// Ingest every manifest of `sequence` in order.
    ///
    /// With `dry_run`, manifests that pass preflight are reported as
    /// `DRY_RUN` and nothing is stored.
    pub async fn ingest_sequence(
        &self,
        sequence: &IngestionSequence,
        defaults: &RecordDefaults,
        dry_run: bool,
    ) -> SequenceSummary {
        let mut summary = SequenceSummary::default();
        let total = sequence.entries.len();

        for (position, entry) in sequence.entries.iter().enumerate() {
            info!(step = position + 1, total, key = %entry.key, kind = %entry.kind, "ingesting manifest");
            let records = match load_manifest(entry, &sequence.root, defaults) {
                Ok(records) => records,
                Err(outcome) => {
                    summary.push(outcome);
                    continue;
                }
            };
            let file = entry.manifest_path(&sequence.root);

            let report = preflight(self.resolver(), self, &records).await;
            if !report.passed() {
                summary.push(
                    ManifestOutcome::new(entry, file, ManifestState::ValidationFail)
                        .with_records(records.len())
                        .with_errors(issue_lines(&report)),
                );
                continue;
            }

            if dry_run {
                summary.push(
                    ManifestOutcome::new(entry, file, ManifestState::DryRun)
                        .with_records(records.len()),
                );
                continue;
            }

            let batch = self.ingest_batch(&records).await;
            summary.push(
                ManifestOutcome::new(entry, file, batch_state(&batch))
                    .with_records(batch.record_count)
                    .with_errors(error_lines(&batch)),
            );
        }

        summary.log_totals();
        summary
    }
}

fn batch_state(report: &BatchReport) -> ManifestState {
    match report.status() {
        BatchStatus::Complete => ManifestState::Success,
        BatchStatus::Partial => ManifestState::PartialFail,
        BatchStatus::Failed => ManifestState::Fail,
    }
}

fn error_lines(report: &BatchReport) -> Vec<String> {
    report
        .record_errors
        .iter()
        .map(|e| format!("ID: {} | Code: {} | Reason: {}", e.id, e.code.as_str(), e.reason))
        .collect()
}
