use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
///
/// Returns whether the command succeeded.
pub async fn dispatch(
    command: Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<bool> {
    match command {
        Commands::Schema { action } => commands::schema::handle(&action, ctx, flags).await,
        Commands::Record { action } => commands::record::handle(&action, ctx, flags).await,
        Commands::Batch { action } => commands::batch::handle(&action, ctx, flags).await,
        Commands::Validate(args) => match &args.schemas {
            Some(dir) => commands::validate::offline(&args, dir, flags).await,
            None => commands::validate::against_store(&args, ctx, flags).await,
        },
    }
}
