// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use indexmap::IndexMap;
use pp_core::config::{StatesConfig, TaskConfig};
use pp_core::{SystemClock, Task, TaskSpec};
use pp_storage::{MemStore, TaskRepo};
use std::sync::Arc;

pub fn task_config() -> TaskConfig {
    let mut buckets = IndexMap::new();
    buckets.insert("queued".to_string(), vec!["queued".to_string()]);
    buckets.insert("running".to_string(), vec!["processing".to_string()]);
    buckets.insert(
        "in_progress".to_string(),
        vec!["processing".to_string(), "fetched".to_string()],
    );
    buckets.insert(
        "complete".to_string(),
        vec!["finished".to_string(), "errored".to_string(), "timed-out".to_string()],
    );
    TaskConfig {
        states: StatesConfig(buckets),
        actions: IndexMap::new(),
        log: String::new(),
        extra_fields: vec![],
        formattable_fields: vec![],
        finished_task_log: "/tmp/finished.log".to_string(),
        parent_notify: false,
    }
}

pub fn mem_repo() -> Arc<TaskRepo> {
    Arc::new(TaskRepo::new(Arc::new(MemStore::new()), task_config(), Arc::new(SystemClock)))
}

pub fn build_task(repo: &TaskRepo, body: serde_json::Value) -> Task {
    repo.build(TaskSpec::from_value(&body).expect("valid spec")).expect("build")
}
