// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process supervisor: wraps one task and one OS process, drives the
//! run protocol, and commits every state transition to the store.

use crate::signal::send_signal;
use pp_core::{Fault, Task, TaskStatus, EXIT_NEVER_STARTED};
use pp_storage::{TaskRepo, INTERNAL_USER};
use std::io::Write;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Grace between the watchdog's SIGTERM and the follow-up SIGKILL.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Shared view of a running supervisor: pid and suspension flag, addressable
/// from the pool's running map while the supervisor owns the child.
#[derive(Clone)]
pub struct ProcHandle {
    pub task_id: String,
    pub cmd: Vec<String>,
    pub priority: i64,
    pid: Arc<AtomicI32>,
    suspended: Arc<AtomicBool>,
}

impl ProcHandle {
    fn new(task: &Task) -> Self {
        Self {
            task_id: task.name().to_string(),
            cmd: task.cmd.clone(),
            priority: task.priority,
            pid: Arc::new(AtomicI32::new(0)),
            suspended: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid as u32),
        }
    }

    pub fn suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// SIGTERM. No-op without a child.
    pub fn terminate(&self) {
        if self.deliver(libc_signal::SIGTERM) {
            self.suspended.store(false, Ordering::SeqCst);
        }
    }

    /// SIGKILL. No-op without a child.
    pub fn kill(&self) {
        if self.deliver(libc_signal::SIGKILL) {
            self.suspended.store(false, Ordering::SeqCst);
        }
    }

    /// SIGSTOP; marks the supervisor suspended. No-op without a child.
    pub fn pause(&self) {
        if self.deliver(libc_signal::SIGSTOP) {
            self.suspended.store(true, Ordering::SeqCst);
        }
    }

    /// SIGCONT; clears the suspension flag. No-op without a child.
    pub fn resume(&self) {
        if self.deliver(libc_signal::SIGCONT) {
            self.suspended.store(false, Ordering::SeqCst);
        }
    }

    /// Returns false when no child exists yet.
    fn deliver(&self, signal: i32) -> bool {
        let Some(pid) = self.pid() else {
            return false;
        };
        if let Err(e) = send_signal(pid, signal) {
            tracing::debug!(pid, signal, error = %e, "signal delivery failed");
        }
        true
    }
}

/// Signal numbers used by the in-process interface. The HTTP interact path
/// carries numbers straight from config instead.
mod libc_signal {
    pub const SIGKILL: i32 = 9;
    pub const SIGTERM: i32 = 15;
    pub const SIGSTOP: i32 = 19;
    pub const SIGCONT: i32 = 18;
}

/// Supervisor for one task.
pub struct Proc {
    task: Task,
    handle: ProcHandle,
    exit_code: Arc<AtomicI32>,
}

impl Proc {
    pub fn new(task: Task) -> Self {
        let handle = ProcHandle::new(&task);
        Self { task, handle, exit_code: Arc::new(AtomicI32::new(EXIT_NEVER_STARTED)) }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn handle(&self) -> ProcHandle {
        self.handle.clone()
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }

    /// `-9999` until a child has been awaited.
    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    pub fn terminate(&self) {
        self.handle.terminate();
    }

    pub fn kill(&self) {
        self.handle.kill();
    }

    pub fn pause(&self) {
        self.handle.pause();
    }

    pub fn resume(&self) {
        self.handle.resume();
    }

    /// Run the task to a terminal state.
    ///
    /// Never propagates child failure: every outcome is persisted on the
    /// task record. A failed store write is logged and the task returned
    /// as-is.
    pub async fn run(mut self, repo: &TaskRepo) -> Task {
        if let Err(fault) = self.run_inner(repo).await {
            tracing::error!(id = self.task.name(), error = %fault, "supervisor commit failed");
        }
        self.task
    }

    async fn run_inner(&mut self, repo: &TaskRepo) -> Result<(), Fault> {
        let Some(program) = self.task.cmd.first().cloned() else {
            self.task.stderr = Some("task has an empty command".to_string());
            return self.commit_terminal(repo, TaskStatus::Errored);
        };
        let log_to_file = !self.task.log.is_empty();

        let stdout_stdio = if log_to_file {
            match std::fs::OpenOptions::new().create(true).append(true).open(&self.task.log) {
                Ok(file) => Stdio::from(file),
                Err(e) => {
                    self.task.stderr =
                        Some(format!("unable to open log file {}: {}", self.task.log, e));
                    return self.commit_terminal(repo, TaskStatus::Errored);
                }
            }
        } else {
            Stdio::piped()
        };

        let mut command = Command::new(&program);
        command
            .args(&self.task.cmd[1..])
            .stdin(Stdio::piped())
            .stdout(stdout_stdio)
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.task.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = &self.task.env {
            // An explicit env replaces the daemon's environment wholesale.
            command.env_clear().envs(env);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                // OS fault: missing binary, permission denied. Recorded on
                // the task, never raised to the pool.
                self.task.stderr = Some(e.to_string());
                if log_to_file {
                    let _ = append_to_log(&self.task.log, e.to_string().as_bytes());
                }
                return self.commit_terminal(repo, TaskStatus::Errored);
            }
        };

        let pid = child.id().unwrap_or(0);
        self.handle.pid.store(pid as i32, Ordering::SeqCst);
        self.task.pid = Some(pid);
        self.task.start_time = Some(repo.clock().timestamp());
        repo.commit_as(
            &mut self.task,
            Some(TaskStatus::Processing),
            Some("task started"),
            INTERNAL_USER,
        )?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Some(input) = self.task.stdin.clone() {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!(id = self.task.name(), error = %e, "stdin write failed");
                }
            }
            // Dropping the handle closes the pipe so the child sees EOF.
        }

        let stdout_reader = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_reader = tokio::spawn(read_stream(child.stderr.take()));

        let mut timed_out = false;
        let wait_result = match self.task.timeout.map(Duration::from_secs) {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(
                        id = self.task.name(),
                        pid,
                        timeout = ?limit,
                        "deadline exceeded, terminating"
                    );
                    self.handle.terminate();
                    match tokio::time::timeout(TIMEOUT_GRACE, child.wait()).await {
                        Ok(result) => result,
                        Err(_) => {
                            self.handle.kill();
                            child.wait().await
                        }
                    }
                }
            },
            None => child.wait().await,
        };

        let exit_code = match wait_result {
            Ok(status) => exit_code_of(status),
            Err(e) => {
                tracing::error!(id = self.task.name(), error = %e, "wait failed");
                -1
            }
        };
        self.exit_code.store(exit_code, Ordering::SeqCst);

        let stdout_bytes = stdout_reader.await.unwrap_or_default();
        let stderr_bytes = stderr_reader.await.unwrap_or_default();

        if !log_to_file && !stdout_bytes.is_empty() {
            self.task.stdout = Some(String::from_utf8_lossy(&stdout_bytes).into_owned());
        }
        let stderr_text = String::from_utf8_lossy(&stderr_bytes).into_owned();

        if log_to_file && !stderr_text.is_empty() {
            if let Err(e) = append_to_log(&self.task.log, stderr_text.as_bytes()) {
                tracing::debug!(id = self.task.name(), error = %e, "stderr log append failed");
            }
        }

        if !stderr_text.is_empty() {
            self.task.stderr = Some(stderr_text.clone());
        }

        let status = if timed_out {
            TaskStatus::TimedOut
        } else if !stderr_text.is_empty() && exit_code != 0 {
            TaskStatus::Errored
        } else {
            TaskStatus::Finished
        };
        self.commit_terminal(repo, status)
    }

    fn commit_terminal(&mut self, repo: &TaskRepo, status: TaskStatus) -> Result<(), Fault> {
        self.task.exit_code = self.exit_code.load(Ordering::SeqCst);
        self.task.end_time = Some(repo.clock().timestamp());

        // The persisted record drops pid (set iff processing); the in-memory
        // record keeps it so the finished-task log line can report it.
        let pid = self.task.pid.take();
        let note =
            format!("task complete -- code: {}, status: {}", self.task.exit_code, status);
        let result = repo.commit_as(&mut self.task, Some(status), Some(&note), INTERNAL_USER);
        self.task.pid = pid;
        result
    }
}

async fn read_stream<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let Some(mut pipe) = pipe else {
        return Vec::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        tracing::debug!(error = %e, "stdio read failed");
    }
    buf
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| -s))
        .unwrap_or(-1)
}

fn append_to_log(path: &str, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)
}

#[cfg(test)]
#[path = "proc_tests.rs"]
mod tests;
