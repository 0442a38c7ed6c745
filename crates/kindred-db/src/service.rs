//! Service layer orchestrating mutations with schema resolution and trail.
//!
//! `KindredService` wraps `KindredDb` (raw database access), the
//! `SchemaResolver`, the `TrailWriter`, and the built-in envelope schemas.
//! Record, schema and batch operations are implemented as
//! `impl KindredService` blocks in `repos`.

use kindred_config::KindredConfig;
use kindred_core::enums::CachePolicy;
use kindred_schema::{BuiltinSchemas, SchemaResolver};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::KindredDb;
use crate::error::{DatabaseError, RecordError};
use crate::trail::writer::TrailWriter;

/// Orchestrates record and schema operations over one connection.
///
/// Every mutation follows this protocol:
/// 1. Take the operation lock
/// 2. Begin transaction
/// 3. Read, resolve, validate, write
/// 4. Append the JSONL trail line
/// 5. Commit, or roll back on any error
///
/// Reads take the same lock so they never observe another operation's
/// uncommitted writes on the shared connection.
pub struct KindredService {
    db: KindredDb,
    resolver: SchemaResolver,
    trail: TrailWriter,
    builtins: BuiltinSchemas,
    actor: String,
    default_limit: u32,
    op_lock: Mutex<()>,
}

impl KindredService {
    /// Build a service from loaded configuration.
    ///
    /// Creates the database's parent directory and the trail directory when
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a directory cannot be created or the
    /// database cannot be opened.
    pub async fn from_config(config: &KindredConfig) -> Result<Self, DatabaseError> {
        if !config.database.is_in_memory() {
            if let Some(parent) = config.database.parent_dir() {
                std::fs::create_dir_all(&parent).map_err(|e| DatabaseError::Other(e.into()))?;
            }
        }
        let db = KindredDb::open_local(&config.database.path).await?;
        let trail = if config.trail.enabled {
            TrailWriter::new(config.trail.dir_path())?
        } else {
            TrailWriter::disabled()
        };
        debug!(
            db = %config.database.path,
            policy = %config.resolver.cache_policy,
            trail = trail.is_enabled(),
            "kindred service opened"
        );
        Ok(Self::from_db(db, trail, config.resolver.cache_policy)
            .with_actor(config.general.actor.clone())
            .with_default_limit(config.general.default_limit))
    }

    /// Create from an existing `KindredDb`.
    #[must_use]
    pub fn from_db(db: KindredDb, trail: TrailWriter, policy: CachePolicy) -> Self {
        Self {
            db,
            resolver: SchemaResolver::new(policy),
            trail,
            builtins: BuiltinSchemas::new(),
            actor: "system".to_string(),
            default_limit: 50,
            op_lock: Mutex::new(()),
        }
    }

    /// Identity written to the create/modify audit stamps.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    #[must_use]
    pub const fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit;
        self
    }

    #[must_use]
    pub const fn db(&self) -> &KindredDb {
        &self.db
    }

    #[must_use]
    pub const fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn trail(&self) -> &TrailWriter {
        &self.trail
    }

    #[must_use]
    pub const fn builtins(&self) -> &BuiltinSchemas {
        &self.builtins
    }

    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    #[must_use]
    pub const fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.op_lock.lock().await
    }

    /// Commit on success, roll back on failure.
    ///
    /// A failed COMMIT leaves the transaction open on the shared connection,
    /// so it is rolled back too. A failed rollback is logged and the original
    /// error returned.
    pub(crate) async fn finish<T>(&self, result: Result<T, RecordError>) -> Result<T, RecordError> {
        match result {
            Ok(value) => match self.db.commit().await {
                Ok(()) => Ok(value),
                Err(commit) => {
                    warn!(error = %commit, "commit failed; rolling back");
                    self.rollback_quietly().await;
                    Err(commit.into())
                }
            },
            Err(err) => {
                self.rollback_quietly().await;
                Err(err)
            }
        }
    }

    async fn rollback_quietly(&self) {
        if let Err(rollback) = self.db.rollback().await {
            warn!(error = %rollback, "rollback failed");
        }
    }
}
