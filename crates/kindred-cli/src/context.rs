use anyhow::Context;
use kindred_config::KindredConfig;
use kindred_db::KindredService;

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: KindredService,
    partition: Option<String>,
}

impl AppContext {
    pub async fn init(config: &KindredConfig, flags: &GlobalFlags) -> anyhow::Result<Self> {
        let service = KindredService::from_config(config)
            .await
            .with_context(|| format!("failed to open database at {}", config.database.path))?;

        let partition = flags
            .partition
            .clone()
            .or_else(|| Some(config.general.default_partition.clone()))
            .filter(|p| !p.trim().is_empty());

        Ok(Self { service, partition })
    }

    /// Partition sent with every surface request; `None` is rejected there.
    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }
}

/// Load layered configuration, then apply command-line overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<KindredConfig> {
    let mut config = KindredConfig::load_with_dotenv().context("failed to load configuration")?;
    if let Some(db) = &flags.db {
        config.database.path.clone_from(db);
    }
    tracing::debug!(
        db = %config.database.path,
        trail = config.trail.enabled,
        limit = config.general.default_limit,
        "configuration loaded"
    );
    Ok(config)
}
