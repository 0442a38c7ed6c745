//! Schema resolution and validation error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One instance-level failure reported by the validation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer into the validated payload (`""` for the root).
    pub path: String,
    pub message: String,
}

/// Every violation found for one payload, in engine order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

impl ValidationFailure {
    /// The first violation, which is what callers see as the reason.
    #[must_use]
    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first() {
            Some(v) if v.path.is_empty() => write!(f, "{}", v.message),
            Some(v) => write!(f, "{} (at {})", v.message, v.path),
            None => f.write_str("payload rejected"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    /// The root schema or an inheritance parent is not registered.
    #[error("Unresolvable schema '{kind}': {reason}")]
    Unresolvable { kind: String, reason: String },

    /// The payload does not satisfy the resolved schema.
    #[error("Schema validation failed: {0}")]
    ValidationFailed(ValidationFailure),

    /// The resolved schema could not be compiled by the validation engine.
    #[error("Schema compilation failed for '{kind}': {reason}")]
    Compile { kind: String, reason: String },

    /// The schema store could not be read.
    #[error("Schema store error: {0}")]
    Source(String),

    /// A stored document is not a usable JSON Schema.
    #[error("Invalid schema document '{kind}': {reason}")]
    InvalidDocument { kind: String, reason: String },
}

impl SchemaError {
    /// Content problems the caller must fix; everything else is infrastructure.
    #[must_use]
    pub const fn is_content_error(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_displays_first_violation_with_path() {
        let failure = ValidationFailure {
            violations: vec![
                Violation {
                    path: "/name".into(),
                    message: "42 is not of type \"string\"".into(),
                },
                Violation {
                    path: String::new(),
                    message: "\"size\" is a required property".into(),
                },
            ],
        };
        assert_eq!(failure.to_string(), "42 is not of type \"string\" (at /name)");
        assert!(SchemaError::ValidationFailed(failure).is_content_error());
    }

    #[test]
    fn unresolvable_is_infrastructure() {
        let err = SchemaError::Unresolvable {
            kind: "ns:Widget:1.0.0".into(),
            reason: "no schema registered".into(),
        };
        assert!(!err.is_content_error());
        assert!(err.to_string().contains("ns:Widget:1.0.0"));
    }
}
