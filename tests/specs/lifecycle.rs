// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-task lifecycle scenarios.

use crate::support::{daemon, submit, wait_terminal};
use pp_core::{Clock, TaskStatus, EXIT_NEVER_STARTED};
use serde_json::json;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(30);

#[tokio::test]
async fn echo_task_finishes_with_stdout() {
    let d = daemon(1);
    let task = submit(&d.repo, json!({"cmd": ["/bin/echo", "hi"], "priority": 50}));
    let id = task.id.unwrap();

    let done = wait_terminal(&d.repo, &id, DEADLINE).await;
    assert_eq!(done.status, TaskStatus::Finished);
    assert_eq!(done.exit_code, 0);
    assert!(done.stdout.unwrap_or_default().contains("hi"));

    // Timestamps respect the lifecycle order.
    assert!(done.start_time.as_deref().unwrap() >= done.init_time.as_str());
    assert!(done.end_time.as_deref().unwrap() >= done.start_time.as_deref().unwrap());
}

#[tokio::test]
async fn missing_binary_errors_with_sentinel_exit_code() {
    let d = daemon(1);
    let task = submit(&d.repo, json!({"cmd": ["/nonexistent/binary"]}));
    let id = task.id.unwrap();

    let done = wait_terminal(&d.repo, &id, DEADLINE).await;
    assert_eq!(done.status, TaskStatus::Errored);
    assert_eq!(done.exit_code, EXIT_NEVER_STARTED);
    assert!(!done.stderr.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn log_template_resolves_date_and_name_before_launch() {
    let d = daemon(1);
    let dir = tempfile::tempdir().unwrap();
    let template = format!("{}/{{date}}/{{name}}.log", dir.path().display());
    let task = submit(
        &d.repo,
        json!({"cmd": ["/bin/echo", "logged"], "log": template}),
    );
    let id = task.id.clone().unwrap();

    // Resolved at build time: the path carries today's date and the id,
    // and its directory exists before the child writes.
    let today = pp_core::format_date(pp_core::SystemClock.epoch_ms());
    assert!(task.log.contains(&today));
    assert!(task.log.contains(&id));
    assert!(std::path::Path::new(&task.log).parent().unwrap().is_dir());

    let done = wait_terminal(&d.repo, &id, DEADLINE).await;
    assert_eq!(done.status, TaskStatus::Finished);
    let contents = std::fs::read_to_string(&done.log).unwrap();
    assert!(contents.contains("logged"));
}

#[tokio::test]
async fn timeout_is_enforced_by_the_watchdog() {
    let d = daemon(1);
    let task = submit(&d.repo, json!({"cmd": ["/bin/sleep", "60"], "timeout": 1}));
    let id = task.id.unwrap();

    let done = wait_terminal(&d.repo, &id, DEADLINE).await;
    assert_eq!(done.status, TaskStatus::TimedOut);
}

#[tokio::test]
async fn finished_tasks_land_in_the_completion_log() {
    let d = daemon(1);
    let task = submit(&d.repo, json!({"cmd": ["/bin/echo", "dumped"], "priority": 7}));
    let id = task.id.unwrap();

    wait_terminal(&d.repo, &id, DEADLINE).await;

    // The consumer observes the terminal artifact shortly after commit.
    let mut waited = Duration::ZERO;
    loop {
        let contents = std::fs::read_to_string(&d.finished_log).unwrap_or_default();
        if contents.contains(&id) {
            assert!(contents.contains("finished:"));
            assert!(contents.contains("-- 7 --"));
            break;
        }
        assert!(waited < DEADLINE, "completion record never written");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
}
