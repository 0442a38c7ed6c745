use std::path::Path;

use anyhow::Context;
use serde_json::Value;

pub mod batch;
pub mod dispatch;
pub mod record;
pub mod schema;
pub mod validate;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Read a file of records: a list, `{"records": [..]}`, or one object.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<Value>> {
    let value = read_json(path)?;
    kindred_schema::preflight::manifest_records(value)
        .with_context(|| format!("no records in {}", path.display()))
}
