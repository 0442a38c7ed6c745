//! Tenant/partition identifier.
//!
//! Every inbound operation carries a partition id. Only its presence is
//! checked; row-level isolation is not enforced.

use std::fmt;

use crate::errors::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionId(String);

impl PartitionId {
    /// Accept a caller-supplied partition id.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MissingPartition` for `None` or a blank string.
    pub fn require(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            Some(s) if !s.is_empty() => Ok(Self(s.to_string())),
            _ => Err(CoreError::MissingPartition),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
