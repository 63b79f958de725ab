// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The collection-store contract and document id handling.

use pp_core::Fault;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid document id: \"{0}\"")]
    InvalidId(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("journal io: {0}")]
    Io(#[from] std::io::Error),

    #[error("document encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<StoreError> for Fault {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidId(_) => Fault::user(e.to_string()),
            other => Fault::application(other.to_string()),
        }
    }
}

/// A named-collection document store.
///
/// Documents are JSON objects carrying their id under `"id"`. All methods
/// are safe under concurrent access; writes are last-writer-wins at the
/// document level.
pub trait Store: Send + Sync {
    /// Insert `doc`, assigning an id unless the document already carries
    /// one, and return the id.
    fn insert(&self, collection: &str, doc: Value) -> Result<String, StoreError>;

    /// Every document matching `query`, in insertion order.
    fn find(&self, collection: &str, query: &Value) -> Result<Vec<Value>, StoreError>;

    /// The first document matching `query`, if any.
    fn find_one(&self, collection: &str, query: &Value) -> Result<Option<Value>, StoreError>;

    /// The matching document with the smallest `sort_by` value; insertion
    /// order breaks ties. Smallest-first keeps the store agreed with the
    /// scheduler's inverted priority ordering.
    fn next(&self, collection: &str, query: &Value, sort_by: &str)
        -> Result<Option<Value>, StoreError>;

    /// Merge the top-level keys of `patch` into the document under `id`.
    /// A missing document is not an error.
    fn update_one(&self, collection: &str, id: &str, patch: &Value) -> Result<(), StoreError>;

    /// Remove every document matching `query`; returns the count removed.
    fn remove(&self, collection: &str, query: &Value) -> Result<u64, StoreError>;
}

/// Generate a fresh document id: `{collection}-{nanoid}`.
pub fn new_doc_id(collection: &str) -> String {
    format!("{}-{}", collection, nanoid::nanoid!(18))
}

/// Validate an externally-supplied id string. Invalid input is a user
/// fault, distinct from store failures.
pub fn validate_id(id: &str) -> Result<&str, StoreError> {
    let well_formed = (4..=64).contains(&id.len())
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(id)
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
