// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journaled on-disk document store.
//!
//! Each collection is an append-only JSON-lines journal replayed into an
//! in-memory map on first access, plus a zstd-compressed snapshot written
//! once the journal grows past a threshold. Insertion order is preserved
//! and breaks sort ties in [`Store::next`].

use crate::query::{compare, matches};
use crate::store::{new_doc_id, validate_id, Store, StoreError};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

/// Journal entries accumulated before the next snapshot + truncate.
const SNAPSHOT_THRESHOLD: usize = 4096;

#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalOp {
    Insert { id: String, doc: Value },
    Update { id: String, doc: Value },
    Remove { id: String },
}

struct CollectionState {
    docs: IndexMap<String, Value>,
    journal: File,
    journal_ops: usize,
}

pub struct FileStore {
    root: PathBuf,
    snapshot_threshold: usize,
    collections: Mutex<HashMap<String, CollectionState>>,
}

impl FileStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            snapshot_threshold: SNAPSHOT_THRESHOLD,
            collections: Mutex::new(HashMap::new()),
        })
    }

    /// Override the snapshot threshold (tests compact with tiny journals).
    pub fn with_snapshot_threshold(mut self, threshold: usize) -> Self {
        self.snapshot_threshold = threshold.max(1);
        self
    }

    fn journal_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.journal", collection))
    }

    fn snapshot_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.snapshot.zst", collection))
    }

    fn with_collection<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut CollectionState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut collections = self.collections.lock();
        if !collections.contains_key(name) {
            collections.insert(name.to_string(), self.load_collection(name)?);
        }
        let state = collections
            .get_mut(name)
            .ok_or_else(|| StoreError::Malformed(format!("collection {} not loaded", name)))?;
        let result = f(state)?;
        if state.journal_ops >= self.snapshot_threshold {
            self.compact(name, state)?;
        }
        Ok(result)
    }

    fn load_collection(&self, name: &str) -> Result<CollectionState, StoreError> {
        let mut docs: IndexMap<String, Value> = IndexMap::new();

        let snapshot_path = self.snapshot_path(name);
        if snapshot_path.exists() {
            let compressed = std::fs::read(&snapshot_path)?;
            let bytes = zstd::decode_all(compressed.as_slice())?;
            docs = serde_json::from_slice(&bytes)?;
        }

        let journal_path = self.journal_path(name);
        let mut journal_ops = 0;
        if journal_path.exists() {
            let reader = BufReader::new(File::open(&journal_path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<JournalOp>(&line) {
                    Ok(op) => {
                        apply(&mut docs, op);
                        journal_ops += 1;
                    }
                    Err(e) => {
                        // A crash can tear the final write; everything before
                        // it is intact, so stop replay at the damage.
                        tracing::warn!(
                            collection = name,
                            error = %e,
                            "stopping journal replay at malformed entry"
                        );
                        break;
                    }
                }
            }
        }

        let journal = OpenOptions::new().create(true).append(true).open(&journal_path)?;
        tracing::debug!(collection = name, docs = docs.len(), journal_ops, "collection loaded");
        Ok(CollectionState { docs, journal, journal_ops })
    }

    fn append(state: &mut CollectionState, op: &JournalOp) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(op)?;
        line.push('\n');
        state.journal.write_all(line.as_bytes())?;
        state.journal_ops += 1;
        Ok(())
    }

    fn compact(&self, name: &str, state: &mut CollectionState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(&state.docs)?;
        let compressed = zstd::encode_all(bytes.as_slice(), 0)?;

        let snapshot_path = self.snapshot_path(name);
        let tmp_path = snapshot_path.with_extension("zst.tmp");
        std::fs::write(&tmp_path, compressed)?;
        std::fs::rename(&tmp_path, &snapshot_path)?;

        state.journal = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.journal_path(name))?;
        state.journal_ops = 0;
        tracing::info!(collection = name, docs = state.docs.len(), "snapshot written");
        Ok(())
    }
}

fn apply(docs: &mut IndexMap<String, Value>, op: JournalOp) {
    match op {
        JournalOp::Insert { id, doc } | JournalOp::Update { id, doc } => {
            docs.insert(id, doc);
        }
        JournalOp::Remove { id } => {
            docs.shift_remove(&id);
        }
    }
}

impl Store for FileStore {
    fn insert(&self, collection: &str, mut doc: Value) -> Result<String, StoreError> {
        let Some(map) = doc.as_object_mut() else {
            return Err(StoreError::Malformed("document must be a JSON object".to_string()));
        };
        let id = match map.get("id").and_then(Value::as_str) {
            Some(existing) => validate_id(existing)?.to_string(),
            None => {
                let id = new_doc_id(collection);
                map.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        self.with_collection(collection, |state| {
            Self::append(state, &JournalOp::Insert { id: id.clone(), doc: doc.clone() })?;
            state.docs.insert(id.clone(), doc);
            Ok(id.clone())
        })
    }

    fn find(&self, collection: &str, query: &Value) -> Result<Vec<Value>, StoreError> {
        self.with_collection(collection, |state| {
            Ok(state.docs.values().filter(|doc| matches(doc, query)).cloned().collect())
        })
    }

    fn find_one(&self, collection: &str, query: &Value) -> Result<Option<Value>, StoreError> {
        self.with_collection(collection, |state| {
            Ok(state.docs.values().find(|doc| matches(doc, query)).cloned())
        })
    }

    fn next(
        &self,
        collection: &str,
        query: &Value,
        sort_by: &str,
    ) -> Result<Option<Value>, StoreError> {
        self.with_collection(collection, |state| {
            Ok(select_next(state.docs.values(), query, sort_by))
        })
    }

    fn update_one(&self, collection: &str, id: &str, patch: &Value) -> Result<(), StoreError> {
        let id = validate_id(id)?.to_string();
        let Some(patch) = patch.as_object() else {
            return Err(StoreError::Malformed("patch must be a JSON object".to_string()));
        };
        self.with_collection(collection, |state| {
            let Some(existing) = state.docs.get(&id) else {
                return Ok(());
            };
            let mut merged = existing.clone();
            if let Some(map) = merged.as_object_mut() {
                for (key, value) in patch {
                    map.insert(key.clone(), value.clone());
                }
                map.insert("id".to_string(), Value::String(id.clone()));
            }
            Self::append(state, &JournalOp::Update { id: id.clone(), doc: merged.clone() })?;
            state.docs.insert(id.clone(), merged);
            Ok(())
        })
    }

    fn remove(&self, collection: &str, query: &Value) -> Result<u64, StoreError> {
        self.with_collection(collection, |state| {
            let ids: Vec<String> = state
                .docs
                .iter()
                .filter(|(_, doc)| matches(doc, query))
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                Self::append(state, &JournalOp::Remove { id: id.clone() })?;
                state.docs.shift_remove(id);
            }
            Ok(ids.len() as u64)
        })
    }
}

/// Smallest `sort_by` value wins; first-seen (insertion order) breaks ties
/// and unordered comparisons.
pub(crate) fn select_next<'a>(
    docs: impl Iterator<Item = &'a Value>,
    query: &Value,
    sort_by: &str,
) -> Option<Value> {
    let mut best: Option<&Value> = None;
    for doc in docs.filter(|doc| matches(doc, query)) {
        best = match best {
            None => Some(doc),
            Some(current) => {
                let candidate = doc.get(sort_by).unwrap_or(&Value::Null);
                let incumbent = current.get(sort_by).unwrap_or(&Value::Null);
                if compare(candidate, incumbent) == Some(std::cmp::Ordering::Less) {
                    Some(doc)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.cloned()
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
