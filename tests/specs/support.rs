// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared wiring for scenario tests: a full scheduler stack over a
//! temporary on-disk store.

use pp_core::config::TaskConfig;
use pp_core::{SystemClock, Task, TaskSpec, TaskStatus};
use pp_engine::{spawn_consumer, FinishedTaskLog, NoopNotify, Pool, StoreSource};
use pp_storage::{FileStore, TaskRepo};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Daemon {
    pub repo: Arc<TaskRepo>,
    pub pool: Pool,
    pub shutdown: CancellationToken,
    pub finished_log: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub fn task_config(dir: &std::path::Path) -> TaskConfig {
    serde_json::from_value(serde_json::json!({
        "states": {
            "queued": ["queued"],
            "running": ["processing"],
            "in_progress": ["processing", "fetched"],
            "complete": ["finished", "errored", "timed-out"]
        },
        "actions": {
            "pause": [19, "paused"],
            "resume": [18, "processing"],
            "kill": [9, "killed"]
        },
        "log": "",
        "extra_fields": [],
        "formattable_fields": [],
        "finished_task_log": dir.join("finished_procs.log").to_str().unwrap()
    }))
    .unwrap()
}

/// Boot a scheduler over a fresh store: dispatcher, pool, event consumer.
pub fn daemon(concurrency: usize) -> Daemon {
    let dir = tempfile::tempdir().unwrap();
    let cfg = task_config(dir.path());
    let finished_log = dir.path().join("finished_procs.log");

    let store = FileStore::open(dir.path().join("db")).unwrap();
    let repo = Arc::new(TaskRepo::new(Arc::new(store), cfg, Arc::new(SystemClock)));

    let (pool, events) = Pool::new(concurrency, Arc::clone(&repo));
    let sink = FinishedTaskLog::open(&finished_log).unwrap();
    spawn_consumer(events, sink, Arc::new(NoopNotify));

    let shutdown = CancellationToken::new();
    pool.start(
        Arc::new(StoreSource::new(Arc::clone(&repo))),
        Duration::from_millis(25),
        shutdown.clone(),
    );

    Daemon { repo, pool, shutdown, finished_log, _dir: dir }
}

/// Build-and-insert a task the way the submit endpoint does.
pub fn submit(repo: &TaskRepo, body: serde_json::Value) -> Task {
    repo.build(TaskSpec::from_value(&body).unwrap()).unwrap()
}

/// Poll the store until the task reaches `status` or the deadline passes.
pub async fn wait_for_status(repo: &TaskRepo, id: &str, status: &TaskStatus, deadline: Duration) -> Task {
    let step = Duration::from_millis(20);
    let mut waited = Duration::ZERO;
    loop {
        if let Some(task) = repo.from_id(id).unwrap() {
            if &task.status == status {
                return task;
            }
        }
        assert!(
            waited < deadline,
            "task {} did not reach {} within {:?}",
            id,
            status,
            deadline
        );
        tokio::time::sleep(step).await;
        waited += step;
    }
}

/// Poll until the task is in any complete status.
pub async fn wait_terminal(repo: &TaskRepo, id: &str, deadline: Duration) -> Task {
    let step = Duration::from_millis(20);
    let mut waited = Duration::ZERO;
    loop {
        if let Some(task) = repo.from_id(id).unwrap() {
            if task.is_complete(repo.config()) {
                return task;
            }
        }
        assert!(waited < deadline, "task {} did not complete within {:?}", id, deadline);
        tokio::time::sleep(step).await;
        waited += step;
    }
}
