use std::path::PathBuf;

use clap::Subcommand;

/// Schema registry commands.
#[derive(Clone, Debug, Subcommand)]
pub enum SchemaCommands {
    /// Register a schema from a JSON file.
    Register { file: PathBuf },
    /// Get a schema by kind or id.
    Get {
        reference: String,
        /// Return the merged, ref-expanded schema.
        #[arg(long)]
        resolve: bool,
    },
    /// Register every `*.json` schema resource in a directory.
    Import {
        dir: PathBuf,
        /// Resolve the resources against each other without storing them.
        #[arg(long)]
        dry_run: bool,
    },
    /// List stored schemas.
    List,
    /// Print a built-in envelope schema, or list their names.
    Builtin { name: Option<String> },
}
