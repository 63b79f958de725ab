// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end through the HTTP facade: submit over the wire, watch the
//! scheduler run the task, read the result back out.

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use pp_core::{Config, SystemClock};
use pp_daemon::http;
use pp_daemon::AppContext;
use pp_engine::{spawn_consumer, FinishedTaskLog, NoopNotify, Pool, StoreSource};
use pp_storage::{FileStore, TaskRepo};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const DEADLINE: Duration = Duration::from_secs(30);

fn full_config(dir: &std::path::Path) -> Config {
    serde_json::from_value(json!({
        "startup": {
            "db": { "url": dir.join("data").to_str().unwrap(), "name": "procpool" },
            "concurrency": 2,
            "log": { "path": dir.join("ppd.log").to_str().unwrap(), "level": "debug" }
        },
        "runtime": {
            "task": {
                "states": {
                    "queued": ["queued"],
                    "running": ["processing"],
                    "in_progress": ["processing", "fetched"],
                    "complete": ["finished", "errored", "timed-out", "killed"]
                },
                "actions": { "pause": [19, "paused"], "resume": [18, "processing"], "kill": [9, "killed"] },
                "log": "",
                "extra_fields": [],
                "formattable_fields": [],
                "finished_task_log": dir.join("finished_procs.log").to_str().unwrap()
            },
            "app": {
                "endpoints": {
                    "tasks_add": "/proc_pool/tasks/add",
                    "tasks_running": "/proc_pool/tasks/running",
                    "tasks_queued": "/proc_pool/tasks/queued",
                    "tasks": "/proc_pool/tasks",
                    "tasks_query": "/proc_pool/tasks/query",
                    "tasks_update": "/proc_pool/tasks/update",
                    "task": "/proc_pool/task/:oid",
                    "task_log": "/proc_pool/task/:oid/log",
                    "task_update": "/proc_pool/task/:oid/update",
                    "task_interact": "/proc_pool/task/:oid/interact",
                    "help_statuses": "/proc_pool/help/statuses",
                    "help_complete": "/proc_pool/help/statuses/complete",
                    "help_in_progress": "/proc_pool/help/statuses/in_progress",
                    "help_endpoints": "/proc_pool/help/endpoints",
                    "config": "/proc_pool/help/config"
                }
            }
        }
    }))
    .unwrap()
}

async fn send(router: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (u16, Value) {
    let mut request = Request::builder().method(method).uri(uri).header("host", "box:9998");
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };
    let response = router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn submit_runs_and_reports_through_the_api() {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(full_config(dir.path()));

    let store = FileStore::open(dir.path().join("data/procpool")).unwrap();
    let repo = Arc::new(TaskRepo::new(
        Arc::new(store),
        config.runtime.task.clone(),
        Arc::new(SystemClock),
    ));
    let (pool, events) = Pool::new(config.startup.concurrency, Arc::clone(&repo));
    let sink = FinishedTaskLog::open(dir.path().join("finished_procs.log")).unwrap();
    spawn_consumer(events, sink, Arc::new(NoopNotify));

    let shutdown = CancellationToken::new();
    pool.start(
        Arc::new(StoreSource::new(Arc::clone(&repo))),
        Duration::from_millis(25),
        shutdown.clone(),
    );

    let ctx = Arc::new(AppContext::new(Arc::clone(&config), Arc::clone(&repo), pool));
    let router = http::router(ctx).unwrap();

    // Submit over the wire.
    let (status, reply) = send(
        &router,
        "POST",
        "/proc_pool/tasks/add",
        Some(json!({"requests": [{"cmd": ["/bin/echo", "over the wire"], "priority": 9}]})),
    )
    .await;
    assert_eq!(status, 200);
    let id = reply["inserted"][0]["id"].as_str().unwrap().to_string();

    // The dispatcher picks it up and runs it to completion.
    let mut waited = Duration::ZERO;
    loop {
        let (status, reply) = send(&router, "GET", &format!("/proc_pool/task/{}?full", id), None).await;
        assert_eq!(status, 200);
        if reply["output"]["status"] == "finished" {
            assert_eq!(reply["output"]["exit_code"], 0);
            assert!(reply["output"]["stdout"].as_str().unwrap().contains("over the wire"));
            break;
        }
        assert!(waited < DEADLINE, "task never finished; last: {}", reply["output"]["status"]);
        tokio::time::sleep(Duration::from_millis(25)).await;
        waited += Duration::from_millis(25);
    }
    shutdown.cancel();

    // Terminal record visible through the query surface too.
    let (status, reply) = send(
        &router,
        "POST",
        "/proc_pool/tasks/query",
        Some(json!({"query": {"status": "finished"}})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(reply["output"].as_array().unwrap().len(), 1);
}
