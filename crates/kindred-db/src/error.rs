//! Error types for kindred-db.

use kindred_core::enums::ErrorCode;
use kindred_core::errors::CoreError;
use kindred_schema::SchemaError;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// A stored column could not be decoded.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outcome of a failed record or schema operation.
///
/// Every variant maps to a stable [`ErrorCode`] through [`RecordError::code`].
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Patch body contains no updatable fields")]
    EmptyPatch,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Record already deleted: {0}")]
    AlreadyDeleted(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Version conflict on record '{id}': expected version {expected}")]
    VersionConflict { id: String, expected: u64 },

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl RecordError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingField(_) | Self::InvalidField { .. } | Self::EmptyPatch => {
                ErrorCode::ValidationError
            }
            Self::Schema(SchemaError::ValidationFailed(_)) => ErrorCode::SchemaValidationError,
            Self::Schema(_) => ErrorCode::SchemaServiceError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::AlreadyDeleted(_) => ErrorCode::AlreadyDeleted,
            Self::VersionConflict { .. } => ErrorCode::VersionConflict,
            Self::Storage(_) => ErrorCode::DbError,
        }
    }

    /// Whether the same request may succeed if retried unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<CoreError> for RecordError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingField(field) => Self::MissingField(field),
            CoreError::InvalidField { field, reason } => Self::InvalidField { field, reason },
            CoreError::InvalidKind { kind, reason } => Self::InvalidField {
                field: "kind".to_string(),
                reason: format!("'{kind}': {reason}"),
            },
            CoreError::MissingPartition => Self::InvalidField {
                field: "partition".to_string(),
                reason: "missing partition identifier".to_string(),
            },
            CoreError::Other(e) => Self::Storage(DatabaseError::Other(e)),
        }
    }
}

impl From<libsql::Error> for RecordError {
    fn from(err: libsql::Error) -> Self {
        Self::Storage(DatabaseError::LibSql(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_schema::{ValidationFailure, Violation};
    use rstest::rstest;

    fn failed_validation() -> SchemaError {
        SchemaError::ValidationFailed(ValidationFailure {
            violations: vec![Violation {
                path: "/name".into(),
                message: "42 is not of type \"string\"".into(),
            }],
        })
    }

    #[rstest]
    #[case(RecordError::MissingField("acl".into()), ErrorCode::ValidationError, false)]
    #[case(RecordError::EmptyPatch, ErrorCode::ValidationError, false)]
    #[case(RecordError::Schema(failed_validation()), ErrorCode::SchemaValidationError, false)]
    #[case(
        RecordError::Schema(SchemaError::Unresolvable { kind: "ns:W:1.0.0".into(), reason: "gone".into() }),
        ErrorCode::SchemaServiceError,
        true
    )]
    #[case(RecordError::NotFound("w1".into()), ErrorCode::NotFound, false)]
    #[case(RecordError::AlreadyDeleted("w1".into()), ErrorCode::AlreadyDeleted, false)]
    #[case(
        RecordError::VersionConflict { id: "w1".into(), expected: 3 },
        ErrorCode::VersionConflict,
        true
    )]
    #[case(RecordError::Storage(DatabaseError::NoResult), ErrorCode::DbError, true)]
    fn codes_and_retryability(
        #[case] err: RecordError,
        #[case] code: ErrorCode,
        #[case] retryable: bool,
    ) {
        assert_eq!(err.code(), code);
        assert_eq!(err.is_retryable(), retryable);
    }

    #[test]
    fn core_errors_map_to_validation() {
        let err: RecordError = CoreError::MissingField("kind".into()).into();
        assert_eq!(err.to_string(), "Missing required field: kind");

        let err: RecordError = CoreError::InvalidKind {
            kind: "bogus".into(),
            reason: "expected namespace:Entity:version".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn schema_validation_message_names_path() {
        let err = RecordError::Schema(failed_validation());
        assert!(err.to_string().contains("/name"));
    }
}
