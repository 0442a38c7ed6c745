//! Schema resolver configuration.

use kindred_core::enums::CachePolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Lifetime of resolved schemas in the shared cache.
    #[serde(default)]
    pub cache_policy: CachePolicy,
}
