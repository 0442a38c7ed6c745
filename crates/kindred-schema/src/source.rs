//! Where raw schema documents come from.
//!
//! The resolver only reads. Anything that can answer "document for this kind"
//! and "document for this id" can back it: the libSQL registry in
//! `kindred-db`, or the in-process [`MemorySchemaStore`] used for offline
//! preflight runs and tests.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use kindred_core::entities::SchemaDocument;
use kindred_core::kind::lookup_key;

use crate::error::SchemaError;

/// Read access to raw, unresolved schema documents.
#[allow(async_fn_in_trait)]
pub trait SchemaSource {
    /// Exact `kind` match first, then canonical-kind match.
    async fn get_by_kind(&self, kind: &str) -> Result<Option<SchemaDocument>, SchemaError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<SchemaDocument>, SchemaError>;
}

/// In-process schema store keyed by schema id.
#[derive(Debug, Default)]
pub struct MemorySchemaStore {
    docs: RwLock<HashMap<String, SchemaDocument>>,
}

impl MemorySchemaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert by id. An existing entry keeps its `created_time`.
    pub fn put(&self, mut doc: SchemaDocument) -> String {
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = docs.get(&doc.id) {
            doc.created_time = existing.created_time;
            doc.modify_time = Utc::now();
        }
        let id = doc.id.clone();
        docs.insert(id.clone(), doc);
        id
    }

    #[must_use]
    pub fn find_by_kind(&self, kind: &str) -> Option<SchemaDocument> {
        let docs = self.docs.read().unwrap_or_else(PoisonError::into_inner);
        let wanted = kind.trim();
        let exact = docs
            .values()
            .filter(|d| d.kind == wanted)
            .max_by_key(|d| d.modify_time);
        if let Some(doc) = exact {
            return Some(doc.clone());
        }
        let canonical = lookup_key(wanted);
        docs.values()
            .filter(|d| d.canonical_kind() == canonical)
            .max_by_key(|d| d.modify_time)
            .cloned()
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<SchemaDocument> {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// All documents, ordered by kind.
    #[must_use]
    pub fn list(&self) -> Vec<SchemaDocument> {
        let mut docs: Vec<SchemaDocument> = self
            .docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        docs.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.id.cmp(&b.id)));
        docs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchemaSource for MemorySchemaStore {
    async fn get_by_kind(&self, kind: &str) -> Result<Option<SchemaDocument>, SchemaError> {
        Ok(self.find_by_kind(kind))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<SchemaDocument>, SchemaError> {
        Ok(self.find_by_id(id))
    }
}
