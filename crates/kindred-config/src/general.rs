//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_actor() -> String {
    "system".to_string()
}

/// Default page size for flattened record listings.
const fn default_limit() -> u32 {
    50
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// User recorded in create/modify audit stamps.
    #[serde(default = "default_actor")]
    pub actor: String,

    /// Partition used by the CLI when `--partition` is not given.
    #[serde(default)]
    pub default_partition: String,

    /// Default page size for listing commands.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            actor: default_actor(),
            default_partition: String::new(),
            default_limit: default_limit(),
        }
    }
}
