// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collection endpoints: submit, listings, raw queries, bulk update.

use super::{reply, validate_post, wants_full, Reply};
use crate::context::AppContext;
use axum::body::Bytes;
use axum::extract::{Host, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use pp_core::{Task, TaskSpec};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn project(tasks: &[Task], full: bool) -> Value {
    Value::Array(tasks.iter().map(|t| if full { t.full() } else { t.slim() }).collect())
}

/// POST `{requests: [...]}`: build and insert each task. The first failure
/// stops the batch; already-inserted slims ride along in the error reply.
pub(crate) async fn add_tasks(
    State(ctx): State<Arc<AppContext>>,
    Host(host): Host,
    body: Bytes,
) -> Result<Json<Value>, Reply> {
    const METHOD: &str = "add_tasks";
    let requests = validate_post(METHOD, &body, "requests")?;

    let Value::Array(requests) = requests else {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            METHOD,
            Value::Null,
            "requests must be a list",
        ));
    };

    let host_url = format!("http://{}/", host);
    let mut inserted: Vec<Value> = Vec::new();
    for request in &requests {
        let built = TaskSpec::from_value(request).and_then(|mut spec| {
            // The submitting host owns the task URL.
            spec.host = host_url.clone();
            ctx.repo.build(spec)
        });
        match built {
            Ok(task) => inserted.push(task.slim()),
            Err(fault) => {
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "method": METHOD,
                        "input": request,
                        "output": [],
                        "message": fault.to_string(),
                        "inserted": inserted,
                    })),
                ));
            }
        }
    }

    Ok(Json(json!({ "inserted": inserted })))
}

/// GET: every task whose status is in the `running` bucket.
pub(crate) async fn get_running(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, Reply> {
    list_bucket(&ctx, "get_running", "running", wants_full(&params))
}

/// GET: every task whose status is in the `queued` bucket.
pub(crate) async fn get_queued(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, Reply> {
    list_bucket(&ctx, "get_queued", "queued", wants_full(&params))
}

fn list_bucket(ctx: &AppContext, method: &str, bucket: &str, full: bool) -> Result<Json<Value>, Reply> {
    let states = &ctx.config.runtime.task.states;
    let statuses = states.bucket(bucket).unwrap_or(&[]);
    let tasks = ctx
        .repo
        .query(&json!({"status": {"$in": statuses}}))
        .map_err(|e| reply(StatusCode::INTERNAL_SERVER_ERROR, method, Value::Null, &e.to_string()))?;
    Ok(super::envelope(method, project(&tasks, full), "Successful request"))
}

/// GET `?state=<bucket>`: tasks by configured state bucket. 404 for an
/// unknown bucket, 500 when the argument is missing.
pub(crate) async fn query_task_states(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, Reply> {
    const METHOD: &str = "query_task_states";
    let states = &ctx.config.runtime.task.states;

    let Some(state) = params.get("state").filter(|s| !s.is_empty()) else {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            METHOD,
            json!([]),
            "Add a \"state=<state>\" argument to the url",
        ));
    };

    let Some(statuses) = states.bucket(state) else {
        let available: Vec<&str> = states.keys().collect();
        return Err(reply(
            StatusCode::NOT_FOUND,
            METHOD,
            json!([]),
            &format!("State \"{}\" not found -- available states: {}", state, available.join(", ")),
        ));
    };

    let tasks = ctx
        .repo
        .query(&json!({"status": {"$in": statuses}}))
        .map_err(|e| reply(StatusCode::INTERNAL_SERVER_ERROR, METHOD, Value::Null, &e.to_string()))?;
    Ok(super::envelope(METHOD, project(&tasks, wants_full(&params)), "Successful request"))
}

/// POST `{query: <store-query-document>}`: raw store query.
pub(crate) async fn tasks_query(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>, Reply> {
    const METHOD: &str = "tasks_query";
    let query = validate_post(METHOD, &body, "query")?;
    let tasks = ctx
        .repo
        .query(&query)
        .map_err(|e| reply(StatusCode::INTERNAL_SERVER_ERROR, METHOD, Value::Null, &e.to_string()))?;
    Ok(super::envelope(METHOD, project(&tasks, wants_full(&params)), "Successful request"))
}

/// POST `{ids: {id: {field: value, ...}, ...}}`: bulk update. Unknown ids
/// are skipped; invalid ids fail the request; bad fields are dropped
/// per-field.
pub(crate) async fn update_tasks(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<Json<Value>, Reply> {
    const METHOD: &str = "update_tasks";
    let ids = validate_post(METHOD, &body, "ids")?;

    let Value::Object(ids) = ids else {
        return Err(reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            METHOD,
            Value::Null,
            "ids must be a mapping of id to update fields",
        ));
    };

    let mut updated = Vec::new();
    for (id, update) in &ids {
        let task = ctx.repo.from_id(id).map_err(|_| {
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                METHOD,
                Value::Null,
                &format!("Invalid ID received: \"{}\"", id),
            )
        })?;
        let Some(mut task) = task else {
            continue;
        };

        if let Value::Object(fields) = update {
            task.apply_update_lenient(fields, &ctx.config.runtime.task);
        }
        updated.push(task.slim());

        ctx.repo.commit(&mut task).map_err(|e| {
            reply(StatusCode::INTERNAL_SERVER_ERROR, METHOD, Value::Null, &e.to_string())
        })?;
    }

    Ok(super::envelope(METHOD, Value::Array(updated), "Successful request"))
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
