// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal interaction with live children.

use crate::support::{daemon, submit, wait_for_status, wait_terminal};
use pp_core::TaskStatus;
use serde_json::json;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(30);

/// Process state letter from /proc/<pid>/stat (Linux).
fn proc_state(pid: u32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    // Field 3, after the parenthesized comm.
    let after = stat.rsplit(')').next()?;
    after.split_whitespace().next()?.chars().next()
}

#[tokio::test]
async fn pause_stops_the_child_and_resume_lets_it_finish() {
    let d = daemon(1);
    let task = submit(&d.repo, json!({"cmd": ["/bin/sleep", "1"]}));
    let id = task.id.unwrap();

    let running = wait_for_status(&d.repo, &id, &TaskStatus::Processing, DEADLINE).await;
    let pid = running.pid.expect("processing task has a pid");

    let handle = d.pool.get(&id).expect("supervisor registered");
    handle.pause();
    assert!(handle.suspended());

    // The child lands in the stopped state and stays there.
    let mut waited = Duration::ZERO;
    while proc_state(pid) != Some('T') {
        assert!(waited < DEADLINE, "child never stopped");
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(proc_state(pid), Some('T'));

    handle.resume();
    assert!(!handle.suspended());

    let done = wait_terminal(&d.repo, &id, DEADLINE).await;
    assert_eq!(done.status, TaskStatus::Finished);
    assert_eq!(done.exit_code, 0);
}

#[tokio::test]
async fn kill_produces_a_signal_exit_code() {
    let d = daemon(1);
    let task = submit(&d.repo, json!({"cmd": ["/bin/sleep", "30"]}));
    let id = task.id.unwrap();

    wait_for_status(&d.repo, &id, &TaskStatus::Processing, DEADLINE).await;
    d.pool.get(&id).expect("supervisor registered").kill();

    let done = wait_terminal(&d.repo, &id, DEADLINE).await;
    // SIGKILL: no stderr, so the exit interpretation stays `finished`,
    // with the signal recorded as a negative exit code.
    assert_eq!(done.exit_code, -9);
    assert_eq!(done.status, TaskStatus::Finished);
}
