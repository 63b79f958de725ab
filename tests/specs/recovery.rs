// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery of in-progress tasks and store durability.

use crate::support::{submit, task_config, wait_terminal};
use pp_core::{SystemClock, TaskStatus};
use pp_engine::{spawn_consumer, FinishedTaskLog, NoopNotify, Pool, StoreSource};
use pp_storage::{FileStore, TaskRepo, INTERNAL_USER};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEADLINE: Duration = Duration::from_secs(30);

#[tokio::test]
async fn restart_relaunches_processing_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = task_config(dir.path());
    let db = dir.path().join("db");

    // First daemon life: a task is committed processing, then the daemon
    // "crashes" (store dropped without any terminal commit).
    let orphan_id;
    {
        let store = FileStore::open(&db).unwrap();
        let repo = TaskRepo::new(Arc::new(store), cfg.clone(), Arc::new(SystemClock));
        let mut task = submit(&repo, json!({"cmd": ["/bin/echo", "rerun"]}));
        task.pid = Some(12345);
        repo.commit_as(&mut task, Some(TaskStatus::Processing), Some("task started"), INTERNAL_USER)
            .unwrap();
        orphan_id = task.id.unwrap();
    }

    // Second life: recovery re-launches the orphan and it completes.
    let store = FileStore::open(&db).unwrap();
    let repo = Arc::new(TaskRepo::new(Arc::new(store), cfg, Arc::new(SystemClock)));
    assert_eq!(repo.in_progress().unwrap().len(), 1);

    let (pool, events) = Pool::new(1, Arc::clone(&repo));
    let sink = FinishedTaskLog::open(dir.path().join("finished_procs.log")).unwrap();
    spawn_consumer(events, sink, Arc::new(NoopNotify));
    let shutdown = CancellationToken::new();
    pool.start(
        Arc::new(StoreSource::new(Arc::clone(&repo))),
        Duration::from_millis(25),
        shutdown.clone(),
    );

    let done = wait_terminal(&repo, &orphan_id, DEADLINE).await;
    shutdown.cancel();
    assert_eq!(done.status, TaskStatus::Finished);
    assert_eq!(done.exit_code, 0);
    // The re-run produced a fresh start note after the orphaned one.
    let starts = done.notes.iter().filter(|n| n.text == "task started").count();
    assert_eq!(starts, 2);
}

#[tokio::test]
async fn store_reopen_preserves_submitted_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = task_config(dir.path());
    let db = dir.path().join("db");

    let id;
    {
        let store = FileStore::open(&db).unwrap();
        let repo = TaskRepo::new(Arc::new(store), cfg.clone(), Arc::new(SystemClock));
        id = submit(&repo, json!({"cmd": ["/bin/echo", "durable"], "priority": 3}))
            .id
            .unwrap();
    }

    let store = FileStore::open(&db).unwrap();
    let repo = TaskRepo::new(Arc::new(store), cfg, Arc::new(SystemClock));
    let task = repo.from_id(&id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.priority, 3);
    assert_eq!(task.notes.first().unwrap().text, "task created");
}
