// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-typed operations over the document store.

use crate::store::{new_doc_id, validate_id, Store, StoreError};
use pp_core::config::TaskConfig;
use pp_core::{Clock, Fault, Task, TaskSpec, TaskStatus};
use serde_json::{json, Value};
use std::sync::Arc;

const COLLECTION: &str = "task";

/// User recorded on notes the daemon writes itself.
pub const INTERNAL_USER: &str = "internal_default";

pub struct TaskRepo {
    store: Arc<dyn Store>,
    cfg: TaskConfig,
    clock: Arc<dyn Clock>,
}

impl TaskRepo {
    pub fn new(store: Arc<dyn Store>, cfg: TaskConfig, clock: Arc<dyn Clock>) -> Self {
        Self { store, cfg, clock }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.cfg
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Build a task from a validated submit spec: enforce the
    /// config-enumerated extra fields, assign the id, interpolate
    /// formattable fields, ensure the log directory, and insert as queued.
    pub fn build(&self, spec: TaskSpec) -> Result<Task, Fault> {
        for key in spec.extra.keys() {
            if !self.cfg.extra_fields.iter().any(|f| f == key) {
                return Err(Fault::user(format!(
                    "unknown field \"{}\" -- allowed extra fields: [{}]",
                    key,
                    self.cfg.extra_fields.join(", ")
                )));
            }
        }

        let mut task = Task::from_spec(spec, &self.cfg.log, self.clock.as_ref());
        // Assigned before interpolation so {name} resolves to the task id.
        task.id = Some(new_doc_id(COLLECTION));
        task.format_fields(&self.cfg, self.clock.as_ref())?;

        if !task.log.is_empty() {
            let parent = std::path::Path::new(&task.log).parent();
            if let Some(parent) = parent.filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Fault::application(format!(
                        "unable to create log directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        self.insert(&mut task)?;
        Ok(task)
    }

    /// Write the task through: refresh `updated_at`, insert if never
    /// inserted, else update by id.
    pub fn commit(&self, task: &mut Task) -> Result<(), Fault> {
        self.commit_as(task, None, None, INTERNAL_USER)
    }

    /// Commit with an optional status transition and note.
    pub fn commit_as(
        &self,
        task: &mut Task,
        status: Option<TaskStatus>,
        note: Option<&str>,
        user: &str,
    ) -> Result<(), Fault> {
        task.updated_at = Some(self.clock.timestamp());
        if let Some(text) = note {
            task.add_note(text, user, self.clock.as_ref());
        }
        if let Some(status) = status {
            task.status = status;
        }
        match task.id.clone() {
            None => self.insert(task),
            Some(id) => {
                let doc = task.to_doc()?;
                self.store.update_one(COLLECTION, &id, &doc).map_err(Fault::from)
            }
        }
    }

    fn insert(&self, task: &mut Task) -> Result<(), Fault> {
        let doc = task.to_doc()?;
        let id = self.store.insert(COLLECTION, doc).map_err(Fault::from)?;
        task.id = Some(id);
        Ok(())
    }

    /// Look up by id string. Malformed ids are a user fault; an unknown but
    /// well-formed id is `None`.
    pub fn from_id(&self, id: &str) -> Result<Option<Task>, Fault> {
        let id = validate_id(id).map_err(|e: StoreError| Fault::from(e))?;
        match self.store.find_one(COLLECTION, &json!({ "id": id }))? {
            Some(doc) => Ok(Some(Task::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    /// All tasks matching a raw store query.
    pub fn query(&self, query: &Value) -> Result<Vec<Task>, Fault> {
        self.store
            .find(COLLECTION, query)?
            .into_iter()
            .map(Task::from_doc)
            .collect()
    }

    /// Pull the next queued task and transition it queued → fetched.
    ///
    /// Smallest priority value wins, agreeing with the in-memory heap.
    pub fn next_queued(&self) -> Result<Option<Task>, Fault> {
        let query = json!({"status": {"$in": self.cfg.states.queued()}});
        let Some(doc) = self.store.next(COLLECTION, &query, "priority")? else {
            return Ok(None);
        };
        let mut task = Task::from_doc(doc)?;
        self.commit_as(&mut task, Some(TaskStatus::Fetched), None, INTERNAL_USER)?;
        Ok(Some(task))
    }

    /// The recovery set: every task persisted in an in-progress status.
    pub fn in_progress(&self) -> Result<Vec<Task>, Fault> {
        self.query(&json!({"status": {"$in": self.cfg.states.in_progress()}}))
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
