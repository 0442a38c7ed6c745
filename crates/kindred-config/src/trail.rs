//! Mutation trail configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_dir() -> String {
    ".kindred/trail".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrailConfig {
    /// Whether committed mutations are appended to JSONL files.
    #[serde(default)]
    pub enabled: bool,

    /// Directory holding one `{YYYY-MM-DD}.jsonl` file per day.
    #[serde(default = "default_dir")]
    pub dir: String,
}

impl TrailConfig {
    #[must_use]
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_dir(),
        }
    }
}
