// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

/// How long supervisors get to drain at shutdown before SIGKILL.
pub fn drain_timeout() -> Duration {
    std::env::var("PROC_POOL_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}

/// Dispatcher poll interval override (default 10 s).
pub fn poll_interval() -> Duration {
    std::env::var("PROC_POOL_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(pp_engine::POLL_INTERVAL)
}
