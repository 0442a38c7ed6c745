//! Reading schema registration resources from a directory.
//!
//! Each `*.json` file holds one registration resource. The kind comes from
//! `kind` or `schemaInfo.schemaIdentity.id`, the body from `schema`, the
//! status from `status` or `schemaInfo.status`. The id defaults to the kind.

use std::path::{Path, PathBuf};

use kindred_core::enums::CachePolicy;
use kindred_core::errors::CoreError;
use kindred_core::requests::{SchemaInfo, SchemaRegistration};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;
use crate::resolver::SchemaResolver;
use crate::source::MemorySchemaStore;

/// One file read from an import directory.
#[derive(Debug)]
pub struct ImportEntry {
    pub file: PathBuf,
    pub registration: Result<SchemaRegistration, String>,
}

/// Per-file outcome of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    Registered,
    /// Dry run: parsed and resolvable against the imported set.
    Resolved,
    /// Dry run: parsed but not resolvable against the imported set.
    Unresolved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatus {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub status: ImportState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Build a registration from a resource file's JSON.
///
/// # Errors
///
/// `CoreError::MissingField` listing every missing field (`kind`, `schema`).
pub fn registration_from_resource(resource: &Value) -> Result<SchemaRegistration, CoreError> {
    let info = resource.get("schemaInfo");
    let kind = resource
        .get("kind")
        .and_then(Value::as_str)
        .or_else(|| {
            info.and_then(|i| i.pointer("/schemaIdentity/id"))
                .and_then(Value::as_str)
        })
        .filter(|k| !k.trim().is_empty());
    let schema = resource.get("schema").filter(|s| s.is_object());

    let mut missing = Vec::new();
    if kind.is_none() {
        missing.push("kind");
    }
    if schema.is_none() {
        missing.push("schema");
    }
    let (Some(kind), Some(schema)) = (kind, schema) else {
        return Err(CoreError::MissingField(missing.join(", ")));
    };

    let id = resource
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(kind);

    Ok(SchemaRegistration {
        id: id.to_string(),
        kind: kind.to_string(),
        status: resource.get("status").and_then(Value::as_str).map(String::from),
        schema: schema.clone(),
        schema_info: info.and_then(Value::as_object).map(|i| SchemaInfo {
            status: i.get("status").and_then(Value::as_str).map(String::from),
        }),
    })
}

/// Read every `*.json` file in `dir`, sorted by file name.
///
/// # Errors
///
/// `SchemaError::Source` if the directory cannot be listed. Per-file read and
/// parse problems are reported in the entries instead.
pub fn read_dir(dir: &Path) -> Result<Vec<ImportEntry>, SchemaError> {
    let listing = std::fs::read_dir(dir)
        .map_err(|e| SchemaError::Source(format!("cannot read {}: {e}", dir.display())))?;

    let mut files: Vec<PathBuf> = listing
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    Ok(files
        .into_iter()
        .map(|file| {
            let registration = std::fs::read_to_string(&file)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()))
                .and_then(|value| registration_from_resource(&value).map_err(|e| e.to_string()));
            ImportEntry { file, registration }
        })
        .collect())
}

impl MemorySchemaStore {
    /// Load every registration resource in `dir` into a fresh store.
    ///
    /// # Errors
    ///
    /// `SchemaError::Source` if the directory cannot be listed.
    pub fn load_dir(dir: &Path) -> Result<(Self, Vec<ImportEntry>), SchemaError> {
        let store = Self::new();
        let entries = read_dir(dir)?;
        for entry in &entries {
            if let Ok(registration) = &entry.registration {
                match registration.clone().into_document() {
                    Ok(doc) => {
                        store.put(doc);
                    }
                    Err(e) => {
                        tracing::warn!(file = %entry.file.display(), error = %e, "schema resource skipped");
                    }
                }
            }
        }
        Ok((store, entries))
    }
}

/// Resolve each parsed entry against `store` without registering anything.
///
/// An entry whose nested references all expand is `Resolved`; one that
/// resolves with soft failures is `Unresolved`, listing them.
pub async fn dry_run(store: &MemorySchemaStore, entries: &[ImportEntry]) -> Vec<ImportStatus> {
    let resolver = SchemaResolver::new(CachePolicy::PerCall);
    let mut statuses = Vec::with_capacity(entries.len());
    for entry in entries {
        let file = entry.file.display().to_string();
        let status = match &entry.registration {
            Err(reason) => ImportStatus {
                file,
                kind: None,
                status: ImportState::Failed,
                reason: Some(reason.clone()),
            },
            Ok(registration) => {
                let kind = Some(registration.kind.clone());
                match resolver.resolve(store, &registration.kind).await {
                    Ok(resolved) if resolved.unresolved_refs.is_empty() => ImportStatus {
                        file,
                        kind,
                        status: ImportState::Resolved,
                        reason: None,
                    },
                    Ok(resolved) => ImportStatus {
                        file,
                        kind,
                        status: ImportState::Unresolved,
                        reason: Some(format!(
                            "unresolved references: {}",
                            resolved.unresolved_refs.join(", ")
                        )),
                    },
                    Err(e) => ImportStatus {
                        file,
                        kind,
                        status: ImportState::Failed,
                        reason: Some(e.to_string()),
                    },
                }
            }
        };
        statuses.push(status);
    }
    statuses
}
