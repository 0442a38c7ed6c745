//! Entity structs for Kindred domain objects.
//!
//! Each entity maps to a table in the libSQL database. All structs derive
//! `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and schema
//! validation.

mod record;
mod schema;

pub use record::Record;
pub use schema::{SchemaDocument, extract_parent_kinds, schema_body};
