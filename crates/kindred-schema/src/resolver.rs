//! Schema resolution: inheritance merge plus `$ref` expansion.
//!
//! Resolution runs in two phases.
//!
//! 1. **Gather** walks the reference graph breadth-first and fetches every
//!    reachable document into an immutable [`Snapshot`]. Documents already in
//!    the shared cache are captured as resolved results and not descended
//!    into. This is the only phase that awaits.
//! 2. **Expand** is a pure recursive walk over the snapshot. It carries the
//!    set of keys on the current path; a parent on the path is skipped, and a
//!    `$ref` on the path is replaced with `{}`.
//!
//! Failure policy: a missing root or a missing inheritance parent aborts with
//! [`SchemaError::Unresolvable`]. A nested `$ref` that is malformed, missing,
//! or fails to resolve is left in place and reported in
//! [`ResolvedSchema::unresolved_refs`].

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use kindred_core::INHERITANCE_KEY;
use kindred_core::entities::{SchemaDocument, schema_body};
use kindred_core::enums::CachePolicy;
use kindred_core::kind::{canonical_reference, is_local_pointer, lookup_key};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::merge::{dedup_required, merge_parent};
use crate::source::SchemaSource;

/// A fully expanded schema: no foreign `$ref` (unless listed in
/// `unresolved_refs`) and no inheritance marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSchema {
    /// Lookup key the schema was resolved under (canonical kind or id).
    pub kind: String,
    pub merged_schema: Value,
    pub resolved_at: DateTime<Utc>,
    /// Nested references that could not be expanded, sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_refs: Vec<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped on every clear; results computed under an older generation are
    /// not written back.
    generation: u64,
    entries: HashMap<String, Arc<ResolvedSchema>>,
}

/// Resolves kinds to merged, ref-free schemas, caching per [`CachePolicy`].
#[derive(Debug)]
pub struct SchemaResolver {
    policy: CachePolicy,
    cache: RwLock<CacheState>,
}

impl SchemaResolver {
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            cache: RwLock::new(CacheState::default()),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Resolve `kind` (or a schema id) against `source`.
    ///
    /// # Errors
    ///
    /// `SchemaError::Unresolvable` when the root or an inheritance parent is
    /// missing, `SchemaError::InvalidDocument` when a needed body is not an
    /// object, `SchemaError::Source` when the store cannot be read.
    pub async fn resolve<S: SchemaSource>(
        &self,
        source: &S,
        kind: &str,
    ) -> Result<Arc<ResolvedSchema>, SchemaError> {
        let root = lookup_key(kind);
        if let Some(hit) = self.cached(&root) {
            debug!(kind = %root, "resolved schema from cache");
            return Ok(hit);
        }

        let generation = self.generation();
        let snapshot = self.gather(source, &root, kind).await?;
        if let Some(hit) = snapshot.cached.get(&root) {
            return Ok(Arc::clone(hit));
        }

        let mut expander = Expander::new(&snapshot);
        let expanded = expander.resolve_key(&root)?;
        let resolved_at = Utc::now();

        let resolved = Arc::new(ResolvedSchema {
            kind: root.clone(),
            merged_schema: expanded.body,
            resolved_at,
            unresolved_refs: expanded.unresolved.into_iter().collect(),
        });

        debug!(
            kind = %root,
            documents = snapshot.docs.len(),
            unresolved = resolved.unresolved_refs.len(),
            "resolved schema"
        );

        self.store(generation, &root, &resolved, expander.memo, resolved_at);
        Ok(resolved)
    }

    /// Drop every cached resolution.
    pub fn clear_cache(&self) {
        let mut state = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
        state.generation += 1;
    }

    /// Notify the resolver that a schema was registered. Returns whether the
    /// cache was cleared, which only happens under
    /// [`CachePolicy::InvalidateOnRegister`].
    pub fn schema_registered(&self) -> bool {
        if self.policy == CachePolicy::InvalidateOnRegister {
            self.clear_cache();
            true
        } else {
            false
        }
    }

    /// Number of cached resolutions.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    fn cached(&self, key: &str) -> Option<Arc<ResolvedSchema>> {
        if self.policy == CachePolicy::PerCall {
            return None;
        }
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(key)
            .cloned()
    }

    fn generation(&self) -> u64 {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    fn store(
        &self,
        generation: u64,
        root: &str,
        resolved: &Arc<ResolvedSchema>,
        memo: HashMap<String, Expanded>,
        resolved_at: DateTime<Utc>,
    ) {
        if self.policy == CachePolicy::PerCall {
            return;
        }
        let mut state = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if state.generation != generation {
            debug!(kind = root, "cache cleared during resolution; result not cached");
            return;
        }
        for (key, expanded) in memo {
            if key == root {
                state.entries.insert(key, Arc::clone(resolved));
            } else {
                let entry = Arc::new(ResolvedSchema {
                    kind: key.clone(),
                    merged_schema: expanded.body,
                    resolved_at,
                    unresolved_refs: expanded.unresolved.into_iter().collect(),
                });
                state.entries.entry(key).or_insert(entry);
            }
        }
    }

    async fn gather<S: SchemaSource>(
        &self,
        source: &S,
        root: &str,
        raw_root: &str,
    ) -> Result<Snapshot, SchemaError> {
        let mut snapshot = Snapshot::default();
        let mut seen: HashSet<String> = HashSet::from([root.to_string()]);
        let mut queue: VecDeque<(String, String)> =
            VecDeque::from([(root.to_string(), raw_root.to_string())]);

        while let Some((key, raw)) = queue.pop_front() {
            if let Some(hit) = self.cached(&key) {
                snapshot.cached.insert(key, hit);
                continue;
            }

            let Some(doc) = fetch(source, &key, &raw).await? else {
                debug!(kind = %key, "no schema document found");
                continue;
            };

            for parent in &doc.parent_kinds {
                let parent_key = lookup_key(parent);
                if seen.insert(parent_key.clone()) {
                    queue.push_back((parent_key, parent.clone()));
                }
            }

            let mut refs = Vec::new();
            collect_refs(schema_body(&doc.raw_schema), &mut refs);
            for reference in refs {
                if let Some(target) = canonical_reference(&reference) {
                    if seen.insert(target.clone()) {
                        queue.push_back((target, reference));
                    }
                }
            }

            snapshot.docs.insert(key, doc);
        }

        Ok(snapshot)
    }
}

impl Default for SchemaResolver {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

/// Kind lookup first, then id lookup under the key, then under the raw string.
///
/// The kind lookup uses the canonical key, never the raw spelling, so every
/// spelling of a kind resolves to the same cached result.
async fn fetch<S: SchemaSource>(
    source: &S,
    key: &str,
    raw: &str,
) -> Result<Option<SchemaDocument>, SchemaError> {
    if let Some(doc) = source.get_by_kind(key).await? {
        return Ok(Some(doc));
    }
    if let Some(doc) = source.get_by_id(key).await? {
        return Ok(Some(doc));
    }
    let raw = raw.trim();
    if raw != key {
        return source.get_by_id(raw).await;
    }
    Ok(None)
}

/// Every non-local `$ref` string in `node`, depth-first.
fn collect_refs(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if !is_local_pointer(reference) {
                    out.push(reference.clone());
                }
            }
            for child in map.values() {
                collect_refs(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

/// Documents reachable from one root, fetched once per resolution.
#[derive(Debug, Default)]
struct Snapshot {
    docs: HashMap<String, SchemaDocument>,
    cached: HashMap<String, Arc<ResolvedSchema>>,
}

impl Snapshot {
    fn contains(&self, key: &str) -> bool {
        self.docs.contains_key(key) || self.cached.contains_key(key)
    }
}

#[derive(Debug, Clone)]
struct Expanded {
    body: Value,
    /// Whether a cycle was cut somewhere below; such bodies depend on the
    /// path they were built under and are never reused.
    cut_cycle: bool,
    unresolved: BTreeSet<String>,
}

impl Expanded {
    fn from_cached(resolved: &ResolvedSchema) -> Self {
        Self {
            body: resolved.merged_schema.clone(),
            cut_cycle: false,
            unresolved: resolved.unresolved_refs.iter().cloned().collect(),
        }
    }

    fn absorb(&mut self, other: &Self) {
        self.cut_cycle |= other.cut_cycle;
        self.unresolved.extend(other.unresolved.iter().cloned());
    }
}

struct Expander<'a> {
    snapshot: &'a Snapshot,
    path: HashSet<String>,
    /// Cycle-free results of this call, keyed by lookup key.
    memo: HashMap<String, Expanded>,
}

impl<'a> Expander<'a> {
    fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            path: HashSet::new(),
            memo: HashMap::new(),
        }
    }

    fn resolve_key(&mut self, key: &str) -> Result<Expanded, SchemaError> {
        let snapshot = self.snapshot;
        if let Some(hit) = snapshot.cached.get(key) {
            return Ok(Expanded::from_cached(hit));
        }
        if let Some(hit) = self.memo.get(key) {
            return Ok(hit.clone());
        }
        let Some(doc) = snapshot.docs.get(key) else {
            return Err(SchemaError::Unresolvable {
                kind: key.to_string(),
                reason: "no schema registered under this kind or id".to_string(),
            });
        };

        self.path.insert(key.to_string());
        let result = self.build(key, doc);
        self.path.remove(key);

        let expanded = result?;
        if !expanded.cut_cycle {
            self.memo.insert(key.to_string(), expanded.clone());
        }
        Ok(expanded)
    }

    fn build(&mut self, key: &str, doc: &SchemaDocument) -> Result<Expanded, SchemaError> {
        let Value::Object(mut body) = schema_body(&doc.raw_schema).clone() else {
            return Err(SchemaError::InvalidDocument {
                kind: key.to_string(),
                reason: "schema body is not a JSON object".to_string(),
            });
        };

        let mut state = Expanded {
            body: Value::Null,
            cut_cycle: false,
            unresolved: BTreeSet::new(),
        };

        for parent in &doc.parent_kinds {
            let parent_key = lookup_key(parent);
            if self.path.contains(&parent_key) {
                debug!(kind = key, parent = %parent_key, "inheritance cycle; parent skipped");
                state.cut_cycle = true;
                continue;
            }
            if !self.snapshot.contains(&parent_key) {
                return Err(SchemaError::Unresolvable {
                    kind: parent_key,
                    reason: format!("inheritance parent of '{key}' is not registered"),
                });
            }
            let resolved_parent = self.resolve_key(&parent_key)?;
            merge_parent(&mut body, &resolved_parent.body);
            state.absorb(&resolved_parent);
        }
        body.remove(INHERITANCE_KEY);
        dedup_required(&mut body);

        let mut value = Value::Object(body);
        self.expand_node(key, &mut value, &mut state);
        state.body = value;
        Ok(state)
    }

    fn expand_node(&mut self, owner: &str, node: &mut Value, state: &mut Expanded) {
        match node {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    if !is_local_pointer(reference) {
                        let reference = reference.clone();
                        if let Some(replacement) = self.expand_ref(owner, &reference, state) {
                            *node = replacement;
                        }
                        return;
                    }
                }
                for child in map.values_mut() {
                    self.expand_node(owner, child, state);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.expand_node(owner, item, state);
                }
            }
            _ => {}
        }
    }

    /// Replacement for a foreign `$ref` node, or `None` to leave it in place.
    fn expand_ref(&mut self, owner: &str, reference: &str, state: &mut Expanded) -> Option<Value> {
        let Some(target) = canonical_reference(reference) else {
            warn!(kind = owner, reference, "malformed $ref left unexpanded");
            state.unresolved.insert(reference.to_string());
            return None;
        };

        if self.path.contains(&target) {
            debug!(kind = owner, reference, "cyclic $ref collapsed to an empty schema");
            state.cut_cycle = true;
            return Some(Value::Object(Map::new()));
        }

        if !self.snapshot.contains(&target) {
            warn!(kind = owner, reference, "no schema for $ref; left unexpanded");
            state.unresolved.insert(reference.to_string());
            return None;
        }

        match self.resolve_key(&target) {
            Ok(resolved) => {
                state.absorb(&resolved);
                Some(resolved.body)
            }
            Err(err) => {
                warn!(kind = owner, reference, error = %err, "$ref target failed to resolve; left unexpanded");
                state.unresolved.insert(reference.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySchemaStore;
    use kindred_core::enums::SchemaStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store_with(docs: &[(&str, Value)]) -> MemorySchemaStore {
        let store = MemorySchemaStore::new();
        for (kind, schema) in docs {
            store.put(
                SchemaDocument::new((*kind).into(), kind, SchemaStatus::Published, schema.clone())
                    .unwrap(),
            );
        }
        store
    }

    #[tokio::test]
    async fn plain_schema_resolves_to_itself() {
        let store = store_with(&[(
            "ns:Widget:1.0.0",
            json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]}),
        )]);
        let resolver = SchemaResolver::default();
        let resolved = resolver.resolve(&store, "ns:Widget:1.0.0").await.unwrap();
        assert_eq!(resolved.kind, "ns:Widget:1.0.0");
        assert_eq!(resolved.merged_schema["required"], json!(["name"]));
        assert!(resolved.unresolved_refs.is_empty());
    }

    #[tokio::test]
    async fn authority_variants_resolve_to_latest_modified() {
        let store = MemorySchemaStore::new();
        let older = SchemaDocument::new(
            "a-x".into(),
            "a:wks:X:1.0.0",
            SchemaStatus::Published,
            json!({"type": "object", "title": "a"}),
        )
        .unwrap();
        let mut newer = SchemaDocument::new(
            "b-x".into(),
            "b:wks:X:1.0.0",
            SchemaStatus::Published,
            json!({"type": "object", "title": "b"}),
        )
        .unwrap();
        newer.modify_time = older.modify_time + chrono::Duration::seconds(1);
        store.put(older);
        store.put(newer);

        let exact = store.get_by_kind("a:wks:X:1.0.0").await.unwrap().unwrap();
        assert_eq!(exact.id, "a-x");

        let resolver = SchemaResolver::default();
        let resolved = resolver.resolve(&store, "a:wks:X:1.0.0").await.unwrap();
        assert_eq!(resolved.kind, "wks:X:1.0.0");
        assert_eq!(resolved.merged_schema["title"], "b");
        let other = resolver.resolve(&store, "b:wks:X:1.0").await.unwrap();
        assert!(Arc::ptr_eq(&resolved, &other));
    }

    #[tokio::test]
    async fn missing_root_is_unresolvable() {
        let resolver = SchemaResolver::default();
        let err = resolver
            .resolve(&MemorySchemaStore::new(), "ns:Ghost:1.0.0")
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::Unresolvable { ref kind, .. } if kind == "ns:Ghost:1.0.0"));
    }

    #[tokio::test]
    async fn local_pointers_are_left_alone() {
        let store = store_with(&[(
            "ns:Widget:1.0.0",
            json!({
                "definitions": {"name": {"type": "string"}},
                "properties": {"name": {"$ref": "#/definitions/name"}}
            }),
        )]);
        let resolved = SchemaResolver::default()
            .resolve(&store, "ns:Widget:1.0.0")
            .await
            .unwrap();
        assert_eq!(
            resolved.merged_schema["properties"]["name"],
            json!({"$ref": "#/definitions/name"})
        );
        assert!(resolved.unresolved_refs.is_empty());
    }

    #[tokio::test]
    async fn cache_hit_returns_same_result() {
        let store = store_with(&[("ns:Widget:1.0.0", json!({"type": "object"}))]);
        let resolver = SchemaResolver::new(CachePolicy::Retain);
        let first = resolver.resolve(&store, "ns:Widget:1.0.0").await.unwrap();
        let second = resolver.resolve(&store, "ns:Widget:1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached_len(), 1);
    }

    #[tokio::test]
    async fn per_call_policy_never_caches() {
        let store = store_with(&[("ns:Widget:1.0.0", json!({"type": "object"}))]);
        let resolver = SchemaResolver::new(CachePolicy::PerCall);
        let first = resolver.resolve(&store, "ns:Widget:1.0.0").await.unwrap();
        let second = resolver.resolve(&store, "ns:Widget:1.0.0").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached_len(), 0);
    }

    #[test]
    fn registration_clears_only_under_invalidate_policy() {
        assert!(SchemaResolver::new(CachePolicy::InvalidateOnRegister).schema_registered());
        assert!(!SchemaResolver::new(CachePolicy::Retain).schema_registered());
        assert!(!SchemaResolver::new(CachePolicy::PerCall).schema_registered());
    }

    #[test]
    fn collect_refs_skips_local_pointers() {
        let mut refs = Vec::new();
        collect_refs(
            &json!({
                "allOf": [{"$ref": "wks:A:1.0.0"}, {"$ref": "#/definitions/x"}],
                "properties": {"b": {"items": {"$ref": "osdu:wks:B:1.0.0"}}}
            }),
            &mut refs,
        );
        refs.sort();
        assert_eq!(refs, vec!["osdu:wks:B:1.0.0".to_string(), "wks:A:1.0.0".to_string()]);
    }
}
