// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query-document matching.
//!
//! The subset of the Mongo query language the daemon itself issues, also
//! accepted from the HTTP query endpoint: top-level field equality plus the
//! `$in`, `$nin`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte` operators.

use serde_json::Value;
use std::cmp::Ordering;

/// True when `doc` satisfies every condition in `query`.
pub fn matches(doc: &Value, query: &Value) -> bool {
    let Value::Object(conditions) = query else {
        return false;
    };
    conditions.iter().all(|(field, condition)| {
        let actual = doc.get(field).unwrap_or(&Value::Null);
        match condition {
            Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                ops.iter().all(|(op, operand)| holds(actual, op, operand))
            }
            expected => actual == expected,
        }
    })
}

fn holds(actual: &Value, op: &str, operand: &Value) -> bool {
    match op {
        "$in" => in_set(actual, operand),
        "$nin" => !in_set(actual, operand),
        "$ne" => actual != operand,
        "$gt" => compare(actual, operand).is_some_and(|o| o == Ordering::Greater),
        "$gte" => compare(actual, operand).is_some_and(|o| o != Ordering::Less),
        "$lt" => compare(actual, operand).is_some_and(|o| o == Ordering::Less),
        "$lte" => compare(actual, operand).is_some_and(|o| o != Ordering::Greater),
        _ => false,
    }
}

fn in_set(actual: &Value, operand: &Value) -> bool {
    let Value::Array(set) = operand else {
        return false;
    };
    match actual {
        Value::Array(items) => items.iter().any(|item| set.contains(item)),
        scalar => set.contains(scalar),
    }
}

/// Order two values of the same kind; `None` for mixed or unordered kinds.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().unwrap_or(f64::NAN).partial_cmp(&y.as_f64().unwrap_or(f64::NAN))
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
