// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP control plane.
//!
//! Route paths come from `runtime.app.endpoints`; the response contracts
//! are fixed. Every handler answers an envelope of
//! `{method, output, message}` (submit adds `inserted`). Body validation
//! answers 406 for a missing body and 500 for undecodable, empty, or
//! key-less payloads.

mod help;
mod task;
mod tasks;

use crate::context::AppContext;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use pp_core::ConfigError;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Build the router from the configured endpoint table. A missing endpoint
/// key is a config fault, fatal at boot.
pub fn router(ctx: Arc<AppContext>) -> Result<Router, ConfigError> {
    let config = Arc::clone(&ctx.config);
    let router = Router::new()
        .route("/", get(help::index))
        .route(config.endpoint("tasks_add")?, post(tasks::add_tasks))
        .route(config.endpoint("tasks_running")?, get(tasks::get_running))
        .route(config.endpoint("tasks_queued")?, get(tasks::get_queued))
        .route(config.endpoint("tasks")?, get(tasks::query_task_states))
        .route(config.endpoint("tasks_query")?, post(tasks::tasks_query))
        .route(config.endpoint("tasks_update")?, post(tasks::update_tasks))
        .route(config.endpoint("task")?, get(task::get_task))
        .route(config.endpoint("task_log")?, get(task::get_log))
        .route(config.endpoint("task_update")?, post(task::update_task))
        .route(config.endpoint("task_interact")?, post(task::task_interact))
        .route(config.endpoint("help_statuses")?, get(help::statuses))
        .route(config.endpoint("help_complete")?, get(help::statuses_complete))
        .route(config.endpoint("help_in_progress")?, get(help::statuses_in_progress))
        .route(config.endpoint("help_endpoints")?, get(help::endpoints))
        .route(config.endpoint("config")?, get(help::config))
        .layer(CorsLayer::permissive())
        .with_state(ctx);
    Ok(router)
}

/// Response envelope shared by every endpoint.
pub(crate) fn envelope(method: &str, output: Value, message: &str) -> Json<Value> {
    Json(json!({
        "method": method,
        "output": output,
        "message": message,
    }))
}

pub(crate) type Reply = (StatusCode, Json<Value>);

pub(crate) fn reply(status: StatusCode, method: &str, output: Value, message: &str) -> Reply {
    (status, envelope(method, output, message))
}

/// Decode a POST body and extract `post_key` from it.
///
/// 406 when no body was sent; 500 for undecodable JSON, an empty payload,
/// or a missing key.
pub(crate) fn validate_post(method: &str, body: &Bytes, post_key: &str) -> Result<Value, Reply> {
    if body.is_empty() {
        tracing::error!(method, "no post data sent");
        return Err(reply(
            StatusCode::NOT_ACCEPTABLE,
            method,
            Value::Null,
            "No Post JSON sent - required",
        ));
    }

    let data: Value = match serde_json::from_slice(body) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(method, error = %e, "unable to decode post data");
            return Err(reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                method,
                Value::Null,
                &e.to_string(),
            ));
        }
    };

    tracing::info!(method, data = %data, "received");

    let empty = match &data {
        Value::Object(map) => map.is_empty(),
        Value::Null => true,
        _ => false,
    };
    if empty {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            method,
            Value::Null,
            "No posted data received",
        ));
    }

    match data.get(post_key) {
        Some(value) if !value.is_null() => Ok(value.clone()),
        _ => Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            method,
            Value::Null,
            &format!("{0} key not found in post data or {0} has an empty value", post_key),
        )),
    }
}

/// `?full` toggles the complete projection on list endpoints.
pub(crate) fn wants_full(params: &std::collections::HashMap<String, String>) -> bool {
    params.contains_key("full")
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
