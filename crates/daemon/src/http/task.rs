// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task endpoints: fetch, log retrieval, update, interact.

use super::{envelope, reply, validate_post, wants_full, Reply};
use crate::context::AppContext;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use pp_core::{Task, TaskStatus};
use pp_storage::INTERNAL_USER;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// GET by id: `full` or `slim` projection; null output when unknown.
pub(crate) async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(oid): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    const METHOD: &str = "get_task";
    let output = match ctx.repo.from_id(&oid) {
        Ok(Some(task)) if wants_full(&params) => task.full(),
        Ok(Some(task)) => task.slim(),
        _ => Value::Null,
    };
    envelope(METHOD, output, "Successful request")
}

/// GET the task's log file as `text/plain`. 404 for an unknown task, 500
/// when the file cannot be read.
pub(crate) async fn get_log(
    State(ctx): State<Arc<AppContext>>,
    Path(oid): Path<String>,
) -> Response {
    let task = match ctx.repo.from_id(&oid) {
        Ok(Some(task)) => task,
        _ => {
            let message = format!(
                "Task {} not found at this service -- try another service or double check the id",
                oid
            );
            return plain(StatusCode::NOT_FOUND, message);
        }
    };

    match std::fs::read(&task.log) {
        Ok(contents) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            contents,
        )
            .into_response(),
        Err(e) => plain(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unable to read from log file -- {}", e),
        ),
    }
}

fn plain(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

/// POST `{update_data: {...}}`: apply field updates to one task.
pub(crate) async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(oid): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, Reply> {
    const METHOD: &str = "update_task";
    let update_data = validate_post(METHOD, &body, "update_data")?;

    let mut task = lookup(&ctx, METHOD, &oid)?;

    if let Value::Object(fields) = &update_data {
        task.apply_update_lenient(fields, &ctx.config.runtime.task);
    }
    ctx.repo
        .commit(&mut task)
        .map_err(|e| reply(StatusCode::INTERNAL_SERVER_ERROR, METHOD, Value::Null, &e.to_string()))?;

    Ok(envelope(METHOD, task.slim(), "Successful request"))
}

/// POST `{action: <name>}`: deliver the configured signal to the task's
/// pid and commit the action's resulting status.
///
/// Rejects unknown actions, complete tasks, and tasks without a pid. The
/// running check is advisory: delivery may race the child's exit, in which
/// case the supervisor's terminal commit wins last-writer.
pub(crate) async fn task_interact(
    State(ctx): State<Arc<AppContext>>,
    Path(oid): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, Reply> {
    const METHOD: &str = "task_interact";
    let action = validate_post(METHOD, &body, "action")?;

    let Value::String(action_name) = action else {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            METHOD,
            Value::Null,
            "action must be a string",
        ));
    };

    let mut task = lookup(&ctx, METHOD, &oid)?;

    let actions = &ctx.config.runtime.task.actions;
    let Some(action) = actions.get(&action_name) else {
        let allowed: Vec<&str> = actions.keys().map(String::as_str).collect();
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            METHOD,
            Value::Null,
            &format!(
                "Action not permitted: {} -- allowed actions: {}",
                action_name,
                allowed.join(", ")
            ),
        ));
    };

    if task.is_complete(&ctx.config.runtime.task) {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            METHOD,
            Value::Null,
            &format!("The task is {} -- nothing to do here", task.status),
        ));
    }

    let Some(pid) = task.pid else {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            METHOD,
            Value::Null,
            "You can only interact with a running task",
        ));
    };

    if let Err(e) = pp_engine::send_signal(pid, action.signal()) {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            METHOD,
            Value::Null,
            &format!("Unable to {} the task -- {}", action_name, e),
        ));
    }

    task.status = TaskStatus::from(action.status());
    let note = format!("Action sent to process: \"{}\"", action_name);
    ctx.repo
        .commit_as(&mut task, None, Some(&note), INTERNAL_USER)
        .map_err(|e| reply(StatusCode::INTERNAL_SERVER_ERROR, METHOD, Value::Null, &e.to_string()))?;

    Ok(envelope(METHOD, task.slim(), &format!("Action success: {}", action_name)))
}

fn lookup(ctx: &AppContext, method: &str, oid: &str) -> Result<Task, Reply> {
    let task = ctx.repo.from_id(oid).map_err(|_| {
        reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            method,
            Value::Null,
            &format!("Invalid ID received: \"{}\"", oid),
        )
    })?;
    task.ok_or_else(|| {
        reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            method,
            Value::Null,
            &format!("Task '{}' does not exist at this service", oid),
        )
    })
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
