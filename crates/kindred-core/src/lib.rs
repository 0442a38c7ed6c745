//! # kindred-core
//!
//! Core types, kind identifiers, and error codes for Kindred.
//!
//! This crate provides the foundational types shared across all Kindred crates:
//! - `Kind` parsing and canonical reference normalization
//! - Entity structs for records and schema documents
//! - Inbound request shapes (record input, patch, schema registration)
//! - Response shapes for single-item and batch operations
//! - Stable error codes and cross-cutting error types
//! - Trail operation envelope for JSONL persistence

pub mod entities;
pub mod enums;
pub mod errors;
pub mod kind;
pub mod partition;
pub mod requests;
pub mod responses;
pub mod trail;

/// Schema key that declares the parent kinds a schema inherits from.
pub const INHERITANCE_KEY: &str = "x-osdu-inheriting-from-kind";

/// Placeholder id reported for batch items that carry no readable id.
pub const MISSING_ID: &str = "<missing>";
