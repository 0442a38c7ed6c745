//! Kind identifiers.
//!
//! A kind names a schema. Two spellings are accepted:
//!
//! ```text
//! namespace:Entity:version              ns:Widget:1.0.0
//! authority:namespace:Entity:version    osdu:wks:master-data--Well:1.0.0
//! ```
//!
//! Every lookup goes through the canonical three-part form
//! `namespace:Entity:major.minor.patch`, so `osdu:wks:Well:1.0` and
//! `wks:Well:1.0.0` address the same schema.
//!
//! Resolution keys and caches by the canonical form only: kinds that differ
//! just in authority collapse to one schema, the most recently modified.
//! Direct schema lookup by kind prefers an exact spelling match first.

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::errors::CoreError;

/// A parsed kind identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Kind {
    authority: Option<String>,
    namespace: String,
    entity: String,
    version: Version,
}

impl Kind {
    /// Parse a kind string.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidKind` if the string does not have three or
    /// four non-empty segments or the version is not semver-like.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidKind {
            kind: raw.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = raw.split(':').collect();
        let (authority, namespace, entity, version) = match parts.as_slice() {
            [ns, entity, version] => (None, *ns, *entity, *version),
            [authority, ns, entity, version] => (Some(*authority), *ns, *entity, *version),
            _ => return Err(invalid("expected namespace:Entity:version")),
        };

        if parts
            .iter()
            .any(|p| p.is_empty() || p.chars().any(char::is_whitespace))
        {
            return Err(invalid("segments must be non-empty and contain no whitespace"));
        }

        let version = parse_lenient_version(version)
            .ok_or_else(|| invalid("version must look like MAJOR[.MINOR[.PATCH]]"))?;

        Ok(Self {
            authority: authority.map(String::from),
            namespace: namespace.to_string(),
            entity: entity.to_string(),
            version,
        })
    }

    /// Canonical three-part form used as the lookup and cache key.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}:{}:{}", self.namespace, self.entity, self.version)
    }

    #[must_use]
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub const fn version(&self) -> &Version {
        &self.version
    }
}

impl FromStr for Kind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(authority) = &self.authority {
            write!(f, "{authority}:")?;
        }
        write!(f, "{}:{}:{}", self.namespace, self.entity, self.version)
    }
}

/// Normalize a reference string to its canonical kind form.
///
/// Returns `None` when the string is not a kind (for example a local JSON
/// pointer or a relative file path).
#[must_use]
pub fn canonical_reference(reference: &str) -> Option<String> {
    Kind::parse(reference.trim()).ok().map(|k| k.canonical())
}

/// Lookup key for a root or parent reference: canonical when parseable,
/// otherwise the trimmed raw string so id-style lookups still work.
#[must_use]
pub fn lookup_key(reference: &str) -> String {
    canonical_reference(reference).unwrap_or_else(|| reference.trim().to_string())
}

/// Whether a `$ref` points inside the current document (`#/definitions/..`).
#[must_use]
pub fn is_local_pointer(reference: &str) -> bool {
    reference.starts_with('#')
}

fn parse_lenient_version(raw: &str) -> Option<Version> {
    let segments: Vec<&str> = raw.split('.').collect();
    let padded = match segments.len() {
        1 => format!("{raw}.0.0"),
        2 => format!("{raw}.0"),
        _ => raw.to_string(),
    };
    Version::parse(&padded).ok()
}
