//! # kindred-db
//!
//! libSQL persistence for Kindred.
//!
//! Holds the schema registry, the record table with its version history, the
//! batch coordinator, and the inbound operation surface. Every mutation runs
//! in its own transaction and, when enabled, is appended to the JSONL trail
//! before commit.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
pub mod surface;
pub mod trail;

#[cfg(test)]
mod test_support;

pub use error::{DatabaseError, RecordError};
pub use service::KindredService;
pub use surface::{ApiReply, ReplyStatus, Request};

use libsql::Builder;

/// Database handle: one libSQL database and its single connection.
pub struct KindredDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl KindredDb {
    /// Open a local database at the given path, or `":memory:"`.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let kindred_db = Self { db, conn };
        kindred_db.run_migrations().await?;
        Ok(kindred_db)
    }

    /// Open a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Same as [`Self::open_local`].
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open_local(":memory:").await
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Start a write transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` if the statement fails.
    pub async fn begin(&self) -> Result<(), DatabaseError> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(())
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` if the statement fails.
    pub async fn commit(&self) -> Result<(), DatabaseError> {
        self.conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` if the statement fails.
    pub async fn rollback(&self) -> Result<(), DatabaseError> {
        self.conn.execute("ROLLBACK", ()).await?;
        Ok(())
    }
}
