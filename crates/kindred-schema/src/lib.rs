//! # kindred-schema
//!
//! Schema resolution and validation for Kindred.
//!
//! - [`SchemaResolver`]: merges inheritance and expands `$ref` into a single
//!   ref-free document, with a cycle guard and a configurable cache
//! - [`validate`]: checks a payload against a resolved schema
//! - [`SchemaSource`]: read contract for raw documents, implemented by
//!   [`MemorySchemaStore`] here and by the libSQL registry in `kindred-db`
//! - [`BuiltinSchemas`]: schemars-generated schemas for Kindred's own envelopes
//! - directory import of registration resources, manifest preflight and
//!   ingestion sequences

mod builtin;
mod error;
pub mod import;
mod merge;
pub mod preflight;
mod resolver;
pub mod sequence;
mod source;
mod validator;

pub use builtin::BuiltinSchemas;
pub use error::{SchemaError, ValidationFailure, Violation};
pub use resolver::{ResolvedSchema, SchemaResolver};
pub use source::{MemorySchemaStore, SchemaSource};
pub use validator::validate;
