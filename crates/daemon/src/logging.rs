// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log sink: non-blocking file appender with a level filter from
//! config. `RUST_LOG` overrides the configured level.

use pp_core::config::LogConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. The returned guard must live as long as
/// the daemon; dropping it stops the writer thread.
pub fn init(log: &LogConfig) -> std::io::Result<WorkerGuard> {
    let path = Path::new(&log.path);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;
    let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("ppd.log"));

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&log.level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn level_directive(level: &str) -> &'static str {
    match level {
        "debug" => "debug",
        "info" => "info",
        "warning" => "warn",
        "error" => "error",
        _ => "debug",
    }
}
