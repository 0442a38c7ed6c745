use std::path::PathBuf;

use clap::Subcommand;

/// Record commands.
#[derive(Clone, Debug, Subcommand)]
pub enum RecordCommands {
    /// Ingest the record (or list of records) in a JSON file.
    Put { file: PathBuf },
    /// Get records by id.
    Get {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        include_deleted: bool,
    },
    /// Apply a partial update from a JSON file.
    Patch { id: String, file: PathBuf },
    /// Soft-delete a record.
    Delete { id: String },
    /// List kinds that have live records.
    Kinds,
    /// List live records with `data` lifted to the top level.
    Flat {
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
}
