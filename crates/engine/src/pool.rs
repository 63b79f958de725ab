// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size execution pool: a slot gate bounding concurrent supervisors,
//! a running map for inspection, and the lifecycle event stream.

use crate::dispatch::{self, TaskSource};
use crate::events::Artifact;
use crate::proc::{Proc, ProcHandle};
use crate::queue::PriorityPool;
use parking_lot::Mutex;
use pp_core::{Task, TaskStatus};
use pp_storage::TaskRepo;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct Pool {
    size: usize,
    repo: Arc<TaskRepo>,
    running: Arc<Mutex<HashMap<String, ProcHandle>>>,
    slots: Arc<Semaphore>,
    events: UnboundedSender<Artifact>,
}

impl Pool {
    /// A pool with `size` slots. The returned receiver is the event stream;
    /// hand it to [`crate::spawn_consumer`].
    pub fn new(size: usize, repo: Arc<TaskRepo>) -> (Self, UnboundedReceiver<Artifact>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let pool = Self {
            size,
            repo,
            running: Arc::new(Mutex::new(HashMap::new())),
            slots: Arc::new(Semaphore::new(size)),
            events,
        };
        (pool, receiver)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently held by a supervisor.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Handles of every live supervisor.
    pub fn running(&self) -> Vec<ProcHandle> {
        self.running.lock().values().cloned().collect()
    }

    /// The live supervisor for a task id, if any.
    pub fn get(&self, id: &str) -> Option<ProcHandle> {
        self.running.lock().get(id).cloned()
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().len()
    }

    /// Take one slot token, waiting until one is free.
    pub async fn acquire_slot(&self) {
        // The semaphore is never closed; a failed acquire cannot happen.
        if let Ok(permit) = self.slots.acquire().await {
            permit.forget();
        }
    }

    /// Launch a supervisor for `proc`. The caller must hold a slot token,
    /// which is released once the terminal state is durable.
    ///
    /// `origin` is the queue the task was popped from, if any; its advisory
    /// map entry is evicted after the terminal commit.
    pub fn launch(&self, proc: Proc, origin: Option<Arc<PriorityPool>>) {
        let repo = Arc::clone(&self.repo);
        let running = Arc::clone(&self.running);
        let slots = Arc::clone(&self.slots);
        let events = self.events.clone();

        let handle = proc.handle();
        let task_id = handle.task_id.clone();
        let parent_url = proc.task().parent_url.clone();
        running.lock().insert(task_id.clone(), handle);

        tokio::spawn(async move {
            let _ = events.send(Artifact {
                status: TaskStatus::Processing,
                parent_url: parent_url.clone(),
                to_delete: None,
            });

            let task = proc.run(&repo).await;
            tracing::debug!(id = %task_id, status = %task.status, "supervisor finished");

            let _ = events.send(Artifact {
                status: task.status.clone(),
                parent_url: task.parent_url.clone(),
                to_delete: Some(task),
            });

            // Terminal commit happened inside run(); only now may the slot
            // free up, so an observer seeing a free slot sees the outcome.
            if let Some(queue) = origin {
                queue.evict(&task_id);
            }
            running.lock().remove(&task_id);
            slots.add_permits(1);
        });
    }

    /// Boot the store-fed dispatcher: recovery of in-progress tasks, then
    /// the steady-state pull loop.
    pub fn start(&self, source: Arc<dyn TaskSource>, poll: Duration, shutdown: CancellationToken) {
        let pool = self.clone();
        tokio::spawn(async move {
            dispatch::run_dispatcher(pool, source, poll, shutdown).await;
        });
    }

    /// Seed a priority queue with `tasks` and start a dispatcher that
    /// consumes slot tokens and pops from it. For in-process callers that
    /// inject tasks directly rather than through the store.
    pub fn input_stream(&self, tasks: Vec<Task>, shutdown: CancellationToken) -> Arc<PriorityPool> {
        let queue = Arc::new(PriorityPool::seeded(tasks));
        let pool = self.clone();
        let feed = Arc::clone(&queue);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = pool.acquire_slot() => {}
                }
                let task = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    task = feed.pop() => task,
                };
                pool.launch(Proc::new(task), Some(Arc::clone(&feed)));
            }
        });
        queue
    }

    /// SIGKILL every live supervisor's child. Used by shutdown after the
    /// drain deadline passes.
    pub fn kill_all(&self) {
        for handle in self.running() {
            tracing::warn!(id = %handle.task_id, "killing survivor at shutdown");
            handle.kill();
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
