use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::subcommands::{BatchCommands, RecordCommands, SchemaCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Schema registry.
    Schema {
        #[command(subcommand)]
        action: SchemaCommands,
    },
    /// Single records.
    Record {
        #[command(subcommand)]
        action: RecordCommands,
    },
    /// List-shaped operations with per-item error reporting.
    Batch {
        #[command(subcommand)]
        action: BatchCommands,
    },
    /// Check a manifest's records against their schemas without storing them.
    Validate(ValidateArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ValidateArgs {
    /// Manifest file: a list of records, `{"records": [..]}`,
    /// `{"ReferenceData": [..]}`, or one record.
    pub manifest: PathBuf,
    /// Resolve against schema resources in this directory instead of the store.
    #[arg(long)]
    pub schemas: Option<PathBuf>,
    /// Treat the file as an ingestion sequence listing manifests.
    #[arg(long)]
    pub sequence: bool,
}
