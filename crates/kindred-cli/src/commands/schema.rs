use std::path::Path;

use anyhow::bail;
use kindred_db::Request;
use kindred_schema::import::{self, ImportState};
use kindred_schema::{BuiltinSchemas, MemorySchemaStore};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::SchemaCommands;
use crate::commands::read_json;
use crate::context::AppContext;
use crate::output::{output, reply};

/// Handle `kdr schema`.
pub async fn handle(
    action: &SchemaCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    match action {
        SchemaCommands::Register { file } => {
            let body = read_json(file)?;
            let answer = ctx
                .service
                .handle(ctx.partition(), Request::RegisterSchema { body })
                .await;
            reply(&answer, flags.format)
        }
        SchemaCommands::Get { reference, resolve } => {
            let request = Request::GetSchema {
                reference: reference.clone(),
                resolve: *resolve,
            };
            reply(&ctx.service.handle(ctx.partition(), request).await, flags.format)
        }
        SchemaCommands::Import { dir, dry_run } => import_dir(dir, *dry_run, ctx, flags).await,
        SchemaCommands::List => {
            output(&ctx.service.list_schemas().await?, flags.format)?;
            Ok(true)
        }
        SchemaCommands::Builtin { name } => builtin(name.as_deref(), flags),
    }
}

/// Handle `kdr schema builtin`.
pub fn builtin(name: Option<&str>, flags: &GlobalFlags) -> anyhow::Result<bool> {
    let builtins = BuiltinSchemas::new();
    match name {
        None => output(&builtins.list(), flags.format)?,
        Some(name) => match builtins.get(name) {
            Some(schema) => output(schema, flags.format)?,
            None => bail!(
                "unknown built-in schema '{name}' (available: {})",
                builtins.list().join(", ")
            ),
        },
    }
    Ok(true)
}

async fn import_dir(
    dir: &Path,
    dry_run: bool,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    let statuses = if dry_run {
        let (store, entries) = MemorySchemaStore::load_dir(dir)?;
        import::dry_run(&store, &entries).await
    } else {
        ctx.service.import_schemas(import::read_dir(dir)?).await
    };

    let failed = statuses
        .iter()
        .filter(|s| s.status == ImportState::Failed)
        .count();
    output(&statuses, flags.format)?;
    if failed > 0 {
        tracing::warn!(failed, total = statuses.len(), "schema import had failures");
    }
    Ok(failed == 0)
}
