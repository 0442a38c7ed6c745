use kindred_db::Request;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::RecordCommands;
use crate::commands::{read_json, read_records};
use crate::context::AppContext;
use crate::output::reply;

/// Handle `kdr record`.
pub async fn handle(
    action: &RecordCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    let request = match action {
        RecordCommands::Put { file } => Request::PutRecords {
            records: read_records(file)?,
        },
        RecordCommands::Get {
            ids,
            include_deleted,
        } => Request::GetRecords {
            ids: ids.clone(),
            include_deleted: *include_deleted,
        },
        RecordCommands::Patch { id, file } => Request::PatchRecord {
            id: id.clone(),
            patch: read_json(file)?,
        },
        RecordCommands::Delete { id } => Request::DeleteRecord { id: id.clone() },
        RecordCommands::Kinds => Request::ListKinds,
        RecordCommands::Flat {
            kind,
            limit,
            offset,
        } => Request::FlattenedRecords {
            kind: kind.clone(),
            limit: *limit,
            offset: *offset,
        },
    };

    reply(&ctx.service.handle(ctx.partition(), request).await, flags.format)
}
