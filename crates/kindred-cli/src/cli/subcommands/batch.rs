use std::path::PathBuf;

use clap::Subcommand;

/// Batch commands.
#[derive(Clone, Debug, Subcommand)]
pub enum BatchCommands {
    /// Ingest a JSON list of records, or every manifest of a sequence.
    Ingest {
        file: PathBuf,
        /// Treat the file as an ingestion sequence listing manifests.
        #[arg(long)]
        sequence: bool,
        /// Preflight each manifest but store nothing.
        #[arg(long, requires = "sequence")]
        dry_run: bool,
    },
    /// Apply a JSON list of patches, each carrying its `id`.
    Patch { file: PathBuf },
    /// Soft-delete records by id.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Retrieve records by id.
    Retrieve {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        include_deleted: bool,
        /// Return every stored version instead of only the latest.
        #[arg(long)]
        all_versions: bool,
    },
}
