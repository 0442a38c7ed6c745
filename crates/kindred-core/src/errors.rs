//! Cross-cutting error types for Kindred.
//!
//! Domain-specific errors (`SchemaError`, `DatabaseError`, `RecordError`) are
//! defined in their respective crates. `CoreError` covers problems detectable
//! from an input alone, before any schema or storage access.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A kind or reference string is not `[authority:]namespace:Entity:version`.
    #[error("Invalid kind '{kind}': {reason}")]
    InvalidKind { kind: String, reason: String },

    /// A required input field is absent.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// An input field is present but has the wrong shape.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// No tenant/partition identifier was supplied.
    #[error("Missing required partition identifier")]
    MissingPartition,

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
