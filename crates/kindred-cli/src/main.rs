use anyhow::Context;
use clap::Parser;

mod cli;
mod commands;
mod context;
mod output;

use cli::subcommands::SchemaCommands;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("kdr error: {error:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether the command succeeded.
async fn run() -> anyhow::Result<bool> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let flags = cli.global_flags();

    // Commands that never touch the store.
    match &cli.command {
        cli::Commands::Schema {
            action: SchemaCommands::Builtin { name },
        } => return commands::schema::builtin(name.as_deref(), &flags),
        cli::Commands::Validate(args) => {
            if let Some(dir) = &args.schemas {
                return commands::validate::offline(args, dir, &flags).await;
            }
        }
        _ => {}
    }

    let config = context::load_config(&flags)?;
    let ctx = context::AppContext::init(&config, &flags)
        .await
        .context("failed to initialize kindred application context")?;

    commands::dispatch::dispatch(cli.command, &ctx, &flags).await
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("KINDRED_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
