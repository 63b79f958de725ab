// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static projections of config: states, buckets, endpoints, the config
//! itself, and the route index at `/`.

use super::envelope;
use crate::context::AppContext;
use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};
use std::sync::Arc;

/// GET `/`: every route this daemon serves.
pub(crate) async fn index(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let mut routes: Vec<String> =
        ctx.config.runtime.app.endpoints.values().cloned().collect();
    routes.push("/".to_string());
    routes.sort();
    Json(json!({ "output": routes }))
}

pub(crate) async fn statuses(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let states = &ctx.config.runtime.task.states;
    envelope(
        "help_statuses",
        serde_json::to_value(states).unwrap_or(Value::Null),
        "Successful request",
    )
}

pub(crate) async fn statuses_complete(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    envelope(
        "help_statuses_complete",
        json!(ctx.config.runtime.task.states.complete()),
        "Successful request",
    )
}

pub(crate) async fn statuses_in_progress(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    envelope(
        "help_statuses_in_progress",
        json!(ctx.config.runtime.task.states.in_progress()),
        "Successful request",
    )
}

pub(crate) async fn endpoints(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let mut values: Vec<String> =
        ctx.config.runtime.app.endpoints.values().cloned().collect();
    values.sort();
    envelope("get_endpoints", json!(values), "Successful request")
}

pub(crate) async fn config(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    envelope(
        "get_config",
        serde_json::to_value(ctx.config.as_ref()).unwrap_or(Value::Null),
        "Successful request",
    )
}
