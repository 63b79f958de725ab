// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use chrono::{Local, TimeZone};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamp format used on persisted task records.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format used by the `{date}` interpolation variable.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A clock that provides the current time
pub trait Clock: Send + Sync {
    fn epoch_ms(&self) -> u64;

    /// Current time as `YYYY-MM-DD HH:MM:SS`.
    fn timestamp(&self) -> String {
        format_timestamp(self.epoch_ms())
    }

    /// Current date as `YYYY-MM-DD`.
    fn date(&self) -> String {
        format_date(self.epoch_ms())
    }
}

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS` in local time.
pub fn format_timestamp(epoch_ms: u64) -> String {
    format_with(epoch_ms, TIME_FORMAT)
}

/// Format epoch milliseconds as `YYYY-MM-DD` in local time.
pub fn format_date(epoch_ms: u64) -> String {
    format_with(epoch_ms, DATE_FORMAT)
}

fn format_with(epoch_ms: u64, format: &str) -> String {
    Local
        .timestamp_millis_opt(epoch_ms as i64)
        .single()
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_default()
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    epoch_ms: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { epoch_ms: Arc::new(Mutex::new(1_000_000_000_000)) }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        *self.epoch_ms.lock() += duration.as_millis() as u64;
    }

    /// Set the epoch milliseconds value
    pub fn set_epoch_ms(&self, ms: u64) {
        *self.epoch_ms.lock() = ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        *self.epoch_ms.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
