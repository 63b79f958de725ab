// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority scheduling under a constrained slot budget.

use crate::support::{daemon, submit, wait_for_status, wait_terminal};
use pp_core::TaskStatus;
use serial_test::serial;
use serde_json::json;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(30);

#[tokio::test]
#[serial]
async fn lower_priority_value_runs_first_in_a_size_one_pool() {
    let d = daemon(1);

    // Occupy the single slot so both contenders are queued together.
    let blocker = submit(&d.repo, json!({"cmd": ["/bin/sleep", "0.4"], "priority": 1}));
    let blocker_id = blocker.id.unwrap();
    wait_for_status(&d.repo, &blocker_id, &TaskStatus::Processing, DEADLINE).await;

    let low = submit(&d.repo, json!({"cmd": ["/bin/sleep", "0.1"], "priority": 100}));
    let high = submit(&d.repo, json!({"cmd": ["/bin/sleep", "0.1"], "priority": 10}));
    let low_id = low.id.unwrap();
    let high_id = high.id.unwrap();

    // The priority-10 task reaches processing first; the priority-100 task
    // is still waiting in queued or fetched.
    wait_for_status(&d.repo, &high_id, &TaskStatus::Processing, DEADLINE).await;
    let waiting = d.repo.from_id(&low_id).unwrap().unwrap();
    assert!(
        matches!(waiting.status, TaskStatus::Queued | TaskStatus::Fetched),
        "priority-100 task should still wait, was {}",
        waiting.status
    );

    let low_done = wait_terminal(&d.repo, &low_id, DEADLINE).await;
    let high_done = wait_terminal(&d.repo, &high_id, DEADLINE).await;
    assert_eq!(low_done.status, TaskStatus::Finished);
    assert_eq!(high_done.status, TaskStatus::Finished);
    assert!(high_done.end_time <= low_done.end_time);
}

#[tokio::test]
#[serial]
async fn pool_size_bounds_concurrent_children() {
    let d = daemon(2);

    let ids: Vec<String> = (0..4)
        .map(|_| {
            submit(&d.repo, json!({"cmd": ["/bin/sleep", "0.2"]}))
                .id
                .unwrap()
        })
        .collect();

    // At no observed moment do more than two tasks hold the processing
    // status.
    let mut saw_processing = false;
    for _ in 0..100 {
        let processing = d
            .repo
            .query(&json!({"status": "processing"}))
            .unwrap()
            .len();
        assert!(processing <= 2, "slot budget exceeded: {} processing", processing);
        saw_processing = saw_processing || processing > 0;
        if d.repo.query(&json!({"status": "finished"})).unwrap().len() == ids.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(saw_processing);

    for id in &ids {
        wait_terminal(&d.repo, id, DEADLINE).await;
    }
}

#[tokio::test]
#[serial]
async fn fifo_among_equal_priorities() {
    let d = daemon(1);

    let blocker = submit(&d.repo, json!({"cmd": ["/bin/sleep", "0.3"], "priority": 1}));
    wait_for_status(&d.repo, &blocker.id.unwrap(), &TaskStatus::Processing, DEADLINE).await;

    let first = submit(&d.repo, json!({"cmd": ["/bin/sleep", "0.05"], "priority": 5}));
    let second = submit(&d.repo, json!({"cmd": ["/bin/sleep", "0.05"], "priority": 5}));
    let first_id = first.id.unwrap();
    let second_id = second.id.unwrap();

    let first_done = wait_terminal(&d.repo, &first_id, DEADLINE).await;
    let second_done = wait_terminal(&d.repo, &second_id, DEADLINE).await;
    assert!(first_done.end_time <= second_done.end_time);
}
