//! Status enums, error codes, cache policy, and trail vocabulary for Kindred.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// SchemaStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a registered schema.
///
/// Serialized as `SCREAMING_CASE`; parsing is case-insensitive because
/// registration payloads in the wild use both `published` and `PUBLISHED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaStatus {
    Draft,
    Published,
    Obsolete,
    Development,
}

impl SchemaStatus {
    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Obsolete => "OBSOLETE",
            Self::Development => "DEVELOPMENT",
        }
    }
}

impl FromStr for SchemaStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            "OBSOLETE" => Ok(Self::Obsolete),
            "DEVELOPMENT" => Ok(Self::Development),
            _ => Err(CoreError::InvalidField {
                field: "status".to_string(),
                reason: format!("unknown schema status '{s}'"),
            }),
        }
    }
}

impl fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CachePolicy
// ---------------------------------------------------------------------------

/// How long resolved schemas stay cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Long-lived cache, cleared whenever a schema is registered.
    #[default]
    InvalidateOnRegister,
    /// Long-lived cache, only cleared explicitly.
    Retain,
    /// No shared cache; every resolution recomputes.
    PerCall,
}

impl CachePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidateOnRegister => "invalidate_on_register",
            Self::Retain => "retain",
            Self::PerCall => "per_call",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Stable, caller-visible error codes.
///
/// Infrastructure codes (`SCHEMA_SERVICE_ERROR`, `DB_ERROR`,
/// `VERSION_CONFLICT`) may be retried as-is; content codes may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    SchemaValidationError,
    SchemaServiceError,
    NotFound,
    AlreadyDeleted,
    VersionConflict,
    DbError,
    NoRecordsCommitted,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::SchemaValidationError => "SCHEMA_VALIDATION_ERROR",
            Self::SchemaServiceError => "SCHEMA_SERVICE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyDeleted => "ALREADY_DELETED",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::DbError => "DB_ERROR",
            Self::NoRecordsCommitted => "NO_RECORDS_COMMITTED",
        }
    }

    /// Whether a caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::SchemaServiceError | Self::DbError | Self::VersionConflict
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trail vocabulary
// ---------------------------------------------------------------------------

/// What kind of mutation a trail line records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrailOp {
    Ingest,
    Patch,
    Delete,
    RegisterSchema,
}

/// Which entity a trail line touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Record,
    Schema,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Record => "record",
            Self::Schema => "schema",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("published".parse::<SchemaStatus>().unwrap(), SchemaStatus::Published);
        assert_eq!(" Draft ".parse::<SchemaStatus>().unwrap(), SchemaStatus::Draft);
        assert!("retired".parse::<SchemaStatus>().is_err());
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&SchemaStatus::Development).unwrap();
        assert_eq!(json, "\"DEVELOPMENT\"");
    }

    #[test]
    fn error_codes_match_wire_strings() {
        for code in [
            ErrorCode::ValidationError,
            ErrorCode::SchemaValidationError,
            ErrorCode::SchemaServiceError,
            ErrorCode::NotFound,
            ErrorCode::AlreadyDeleted,
            ErrorCode::VersionConflict,
            ErrorCode::DbError,
            ErrorCode::NoRecordsCommitted,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, serde_json::Value::String(code.as_str().to_string()));
        }
    }

    #[test]
    fn only_infrastructure_codes_are_retryable() {
        assert!(ErrorCode::SchemaServiceError.is_retryable());
        assert!(ErrorCode::DbError.is_retryable());
        assert!(!ErrorCode::SchemaValidationError.is_retryable());
        assert!(!ErrorCode::AlreadyDeleted.is_retryable());
    }

    #[test]
    fn cache_policy_default_invalidates() {
        assert_eq!(CachePolicy::default(), CachePolicy::InvalidateOnRegister);
        let parsed: CachePolicy = serde_json::from_str("\"per_call\"").unwrap();
        assert_eq!(parsed, CachePolicy::PerCall);
    }
}
