// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon tests: a complete config and a router backed
//! by an in-memory store.

use crate::context::AppContext;
use crate::http;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pp_core::{Config, SystemClock};
use pp_engine::Pool;
use pp_storage::{MemStore, TaskRepo};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub fn test_config() -> Config {
    serde_json::from_value(json!({
        "startup": {
            "db": { "url": "/tmp/pp-test", "name": "procpool" },
            "concurrency": 2,
            "log": { "path": "/tmp/ppd-test.log", "level": "debug" }
        },
        "runtime": {
            "task": {
                "states": {
                    "queued": ["queued"],
                    "running": ["processing"],
                    "in_progress": ["processing", "fetched"],
                    "complete": ["finished", "errored", "timed-out", "killed", "terminated"]
                },
                "actions": {
                    "pause": [19, "paused"],
                    "resume": [18, "processing"],
                    "terminate": [15, "terminated"],
                    "kill": [9, "killed"]
                },
                "log": "",
                "extra_fields": ["team"],
                "formattable_fields": [],
                "finished_task_log": "/tmp/pp-test-finished.log"
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
    .expect("test config is valid")
}

pub fn test_app() -> (Router, Arc<AppContext>) {
    let config = Arc::new(test_config());
    let repo = Arc::new(TaskRepo::new(
        Arc::new(MemStore::new()),
        config.runtime.task.clone(),
        Arc::new(SystemClock),
    ));
    let (pool, _events) = Pool::new(config.startup.concurrency, Arc::clone(&repo));
    let ctx = Arc::new(AppContext::new(config, repo, pool));
    let router = http::router(Arc::clone(&ctx)).expect("router builds");
    (router, ctx)
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(router, method, uri, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn send_raw(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "box:9998");
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&value).expect("serializable body"))
        }
        None => Body::empty(),
    };
    let request = request.body(body).expect("request builds");

    let response = router.clone().oneshot(request).await.expect("handler responds");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body collects").to_bytes();
    (status, bytes.to_vec())
}
