// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher: recovers in-progress tasks at startup, then feeds the pool
//! from the store one slot token at a time.

use crate::pool::Pool;
use crate::proc::Proc;
use pp_core::{Fault, Task};
use pp_storage::TaskRepo;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleep between polls while the queue is empty.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Where the dispatcher gets work. The store-backed implementation is
/// [`StoreSource`]; tests substitute their own.
pub trait TaskSource: Send + Sync {
    /// Every task persisted in an in-progress status, re-launched at boot.
    ///
    /// A crash mid-run leaves `processing` records whose true state is
    /// unknown; re-running is chosen over leaking them, accepting duplicate
    /// side effects for non-idempotent commands.
    fn recover(&self) -> Result<Vec<Task>, Fault>;

    /// The next queued task, already transitioned queued → fetched.
    fn next(&self) -> Result<Option<Task>, Fault>;
}

/// Default task source: the task collection in the store.
pub struct StoreSource {
    repo: Arc<TaskRepo>,
}

impl StoreSource {
    pub fn new(repo: Arc<TaskRepo>) -> Self {
        Self { repo }
    }
}

impl TaskSource for StoreSource {
    fn recover(&self) -> Result<Vec<Task>, Fault> {
        self.repo.in_progress()
    }

    fn next(&self) -> Result<Option<Task>, Fault> {
        self.repo.next_queued()
    }
}

pub(crate) async fn run_dispatcher(
    pool: Pool,
    source: Arc<dyn TaskSource>,
    poll: Duration,
    shutdown: CancellationToken,
) {
    match source.recover() {
        Ok(tasks) => {
            for task in tasks {
                tracing::info!(id = task.name(), status = %task.status, "re-launching in-progress task");
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = pool.acquire_slot() => {}
                }
                pool.launch(Proc::new(task), None);
            }
        }
        Err(e) => tracing::error!(error = %e, "startup recovery failed"),
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = pool.acquire_slot() => {}
        }

        let task = loop {
            match source.next() {
                Ok(Some(task)) => break task,
                Ok(None) => {}
                // Not an error at this layer; sleep and retry.
                Err(e) => tracing::error!(error = %e, "next-task pull failed"),
            }
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(poll) => {}
            }
        };

        pool.launch(Proc::new(task), None);
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
