use std::path::Path;

use kindred_core::partition::PartitionId;
use kindred_db::Request;
use kindred_schema::sequence::{IngestionSequence, RecordDefaults};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::BatchCommands;
use crate::commands::read_records;
use crate::context::AppContext;
use crate::output::{output, reply};

/// Handle `kdr batch`.
pub async fn handle(
    action: &BatchCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    let request = match action {
        BatchCommands::Ingest {
            file,
            sequence: true,
            dry_run,
        } => return ingest_sequence(file, *dry_run, ctx, flags).await,
        BatchCommands::Ingest { file, .. } => Request::BatchIngest {
            records: read_records(file)?,
        },
        BatchCommands::Patch { file } => Request::BatchPatch {
            patches: read_records(file)?,
        },
        BatchCommands::Delete { ids } => Request::BatchDelete { ids: ids.clone() },
        BatchCommands::Retrieve {
            ids,
            include_deleted,
            all_versions,
        } => Request::BatchRetrieve {
            ids: ids.clone(),
            include_deleted: *include_deleted,
            latest_only: !*all_versions,
        },
    };

    reply(&ctx.service.handle(ctx.partition(), request).await, flags.format)
}

/// Handle `kdr batch ingest <sequence> --sequence [--dry-run]`.
async fn ingest_sequence(
    path: &Path,
    dry_run: bool,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    let partition = PartitionId::require(ctx.partition())?;
    let sequence = IngestionSequence::read(path)?;
    tracing::info!(%partition, manifests = sequence.entries.len(), dry_run, "ingesting sequence");
    let summary = ctx
        .service
        .ingest_sequence(&sequence, &RecordDefaults::default(), dry_run)
        .await;
    output(&summary, flags.format)?;
    Ok(summary.passed())
}
