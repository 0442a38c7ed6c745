use std::path::Path;

use kindred_core::enums::CachePolicy;
use kindred_schema::preflight::{PreflightReport, preflight};
use kindred_schema::sequence::{IngestionSequence, RecordDefaults, validate_sequence};
use kindred_schema::{MemorySchemaStore, SchemaResolver, SchemaSource};
use tracing::warn;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ValidateArgs;
use crate::commands::read_records;
use crate::context::AppContext;
use crate::output::output;

/// Handle `kdr validate <manifest> --schemas <dir>`: resolve against schema
/// files only; the store is never opened.
pub async fn offline(args: &ValidateArgs, dir: &Path, flags: &GlobalFlags) -> anyhow::Result<bool> {
    let (store, entries) = MemorySchemaStore::load_dir(dir)?;
    for entry in &entries {
        if let Err(reason) = &entry.registration {
            warn!(file = %entry.file.display(), %reason, "schema resource skipped");
        }
    }

    let resolver = SchemaResolver::new(CachePolicy::Retain);
    run(args, &resolver, &store, flags).await
}

/// Handle `kdr validate <manifest>` against the registered schemas.
pub async fn against_store(
    args: &ValidateArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    run(args, ctx.service.resolver(), &ctx.service, flags).await
}

async fn run<S: SchemaSource>(
    args: &ValidateArgs,
    resolver: &SchemaResolver,
    source: &S,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    if args.sequence {
        let sequence = IngestionSequence::read(&args.manifest)?;
        let summary =
            validate_sequence(resolver, source, &sequence, &RecordDefaults::default()).await;
        output(&summary, flags.format)?;
        return Ok(summary.passed());
    }

    let records = read_records(&args.manifest)?;
    let report = preflight(resolver, source, &records).await;
    finish(&report, flags)
}

fn finish(report: &PreflightReport, flags: &GlobalFlags) -> anyhow::Result<bool> {
    output(report, flags.format)?;
    Ok(report.passed())
}
