// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for tests and in-process callers. Same contract as
//! [`crate::FileStore`], nothing on disk.

use crate::file::select_next;
use crate::query::matches;
use crate::store::{new_doc_id, validate_id, Store, StoreError};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemStore {
    collections: Mutex<HashMap<String, IndexMap<String, Value>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
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
        self.collections.lock().entry(collection.to_string()).or_default().insert(id.clone(), doc);
        Ok(id)
    }

    fn find(&self, collection: &str, query: &Value) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .map(|docs| docs.values().filter(|doc| matches(doc, query)).cloned().collect())
            .unwrap_or_default())
    }

    fn find_one(&self, collection: &str, query: &Value) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .and_then(|docs| docs.values().find(|doc| matches(doc, query)).cloned()))
    }

    fn next(
        &self,
        collection: &str,
        query: &Value,
        sort_by: &str,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .lock()
            .get(collection)
            .and_then(|docs| select_next(docs.values(), query, sort_by)))
    }

    fn update_one(&self, collection: &str, id: &str, patch: &Value) -> Result<(), StoreError> {
        let id = validate_id(id)?.to_string();
        let Some(patch) = patch.as_object() else {
            return Err(StoreError::Malformed("patch must be a JSON object".to_string()));
        };
        let mut collections = self.collections.lock();
        let Some(doc) = collections.get_mut(collection).and_then(|docs| docs.get_mut(&id)) else {
            return Ok(());
        };
        if let Some(map) = doc.as_object_mut() {
            for (key, value) in patch {
                map.insert(key.clone(), value.clone());
            }
            map.insert("id".to_string(), Value::String(id));
        }
        Ok(())
    }

    fn remove(&self, collection: &str, query: &Value) -> Result<u64, StoreError> {
        let mut collections = self.collections.lock();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let ids: Vec<String> = docs
            .iter()
            .filter(|(_, doc)| matches(doc, query))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            docs.shift_remove(id);
        }
        Ok(ids.len() as u64)
    }
}

#[cfg(test)]
#[path = "mem_tests.rs"]
mod tests;
