// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle artifacts and the consumer that drains them.

use crate::notify::ParentNotify;
use parking_lot::Mutex;
use pp_core::{Task, TaskStatus};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Payload of one lifecycle event.
///
/// `to_delete` carries the terminal task for the completion log; it is
/// `None` on the `processing` event.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub status: TaskStatus,
    pub parent_url: String,
    pub to_delete: Option<Task>,
}

/// Append-only sink for one structured record per finished task.
pub struct FinishedTaskLog {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl FinishedTaskLog {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One line: `{status}: {id} -- {pid} -- {priority} -- {cmd} -- {exit_code}`.
    pub fn record(&self, task: &Task) {
        let line = format!(
            "{}: {} -- {} -- {} -- {} -- {}\n",
            task.status,
            task.name(),
            task.pid.map_or_else(|| "-".to_string(), |pid| pid.to_string()),
            task.priority,
            task.cmd.join(" "),
            task.exit_code,
        );
        if let Err(e) = self.file.lock().write_all(line.as_bytes()) {
            tracing::error!(path = %self.path.display(), error = %e, "finished-task log write failed");
        }
    }
}

/// Drain the event stream for the daemon's lifetime.
///
/// Terminal artifacts are logged to the finished-task sink; artifacts with
/// a parent URL go through the notify hook. The worker exits when every
/// sender is gone.
pub fn spawn_consumer(
    mut events: UnboundedReceiver<Artifact>,
    sink: FinishedTaskLog,
    notify: Arc<dyn ParentNotify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(artifact) = events.recv().await {
            tracing::debug!(status = %artifact.status, "artifact fetched");
            if !artifact.parent_url.is_empty() {
                notify.notify(&artifact.parent_url, artifact.status.as_str()).await;
            }
            if let Some(task) = artifact.to_delete {
                sink.record(&task);
            }
        }
        tracing::debug!("event stream closed");
    })
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
