// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn insert_find_update_remove_cycle() {
    let store = MemStore::new();
    let id = store.insert("task", json!({"status": "queued", "priority": 7})).unwrap();

    assert_eq!(store.find("task", &json!({"status": "queued"})).unwrap().len(), 1);

    store.update_one("task", &id, &json!({"status": "processing"})).unwrap();
    let doc = store.find_one("task", &json!({"id": id})).unwrap().unwrap();
    assert_eq!(doc["status"], "processing");
    assert_eq!(doc["priority"], 7);

    assert_eq!(store.remove("task", &json!({"status": "processing"})).unwrap(), 1);
    assert!(store.find("task", &json!({})).unwrap().is_empty());
}

#[test]
fn next_prefers_smallest_priority() {
    let store = MemStore::new();
    store.insert("task", json!({"status": "queued", "priority": 50})).unwrap();
    store.insert("task", json!({"status": "queued", "priority": 10})).unwrap();
    let next = store.next("task", &json!({"status": "queued"}), "priority").unwrap().unwrap();
    assert_eq!(next["priority"], 10);
}

#[test]
fn collections_are_isolated() {
    let store = MemStore::new();
    store.insert("task", json!({"a": 1})).unwrap();
    assert!(store.find("other", &json!({})).unwrap().is_empty());
}
