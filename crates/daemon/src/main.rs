// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ppd` — the proc-pool daemon.
//!
//! Boot order: config, log sink, store lock, store, scheduler workers,
//! HTTP listener. Config faults exit nonzero before anything else starts.

use clap::Parser;
use fs2::FileExt;
use pp_core::{Config, SystemClock};
use pp_daemon::context::AppContext;
use pp_daemon::{env, http, logging};
use pp_engine::{
    spawn_consumer, FinishedTaskLog, HttpNotify, NoopNotify, ParentNotify, Pool, StoreSource,
};
use pp_storage::{FileStore, TaskRepo};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "ppd", version, about = "Process execution daemon")]
struct Args {
    /// Config file path; defaults to $PROC_POOL_CONFIG.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::resolve_path(args.config).and_then(|path| Config::load(&path)) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("ppd: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init(&config.startup.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ppd: unable to open log sink {}: {}", config.startup.log.path, e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{}", message);
            eprintln!("ppd: {}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Arc<Config>) -> Result<(), String> {
    let data_dir = PathBuf::from(&config.startup.db.url).join(&config.startup.db.name);
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| format!("unable to create data directory {}: {}", data_dir.display(), e))?;

    // One daemon per store. Held for the process lifetime.
    let lock_path = data_dir.join("ppd.lock");
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| format!("unable to open lock file {}: {}", lock_path.display(), e))?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| format!("another daemon already holds {}", lock_path.display()))?;
    let _ = lock_file.set_len(0);
    let _ = writeln!(lock_file, "{}", std::process::id());

    let store = FileStore::open(&data_dir).map_err(|e| format!("unable to open store: {}", e))?;
    let repo = Arc::new(TaskRepo::new(
        Arc::new(store),
        config.runtime.task.clone(),
        Arc::new(SystemClock),
    ));

    let (pool, events) = Pool::new(config.startup.concurrency, Arc::clone(&repo));

    let sink = FinishedTaskLog::open(&config.runtime.task.finished_task_log)
        .map_err(|e| format!("unable to open finished-task log: {}", e))?;
    let notify: Arc<dyn ParentNotify> = if config.runtime.task.parent_notify {
        Arc::new(HttpNotify::new())
    } else {
        Arc::new(NoopNotify)
    };
    spawn_consumer(events, sink, notify);

    let shutdown = CancellationToken::new();
    pool.start(
        Arc::new(StoreSource::new(Arc::clone(&repo))),
        env::poll_interval(),
        shutdown.clone(),
    );

    let ctx = Arc::new(AppContext::new(Arc::clone(&config), repo, pool.clone()));
    let router = http::router(ctx).map_err(|e| e.to_string())?;

    let listener = tokio::net::TcpListener::bind(&config.startup.http.bind)
        .await
        .map_err(|e| format!("unable to bind {}: {}", config.startup.http.bind, e))?;
    info!(
        bind = %config.startup.http.bind,
        concurrency = config.startup.concurrency,
        data_dir = %data_dir.display(),
        "daemon up"
    );

    let signal_shutdown = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            info!("shutdown signal received");
            signal_shutdown.cancel();
        })
        .await
        .map_err(|e| format!("http server error: {}", e))?;

    drain(&pool).await;
    info!("daemon stopped");
    Ok(())
}

/// Wait out running supervisors, then SIGKILL survivors past the deadline.
async fn drain(pool: &Pool) {
    let deadline = env::drain_timeout();
    info!(running = pool.running_count(), deadline = ?deadline, "draining supervisors");

    if wait_idle(pool, deadline).await {
        return;
    }
    pool.kill_all();
    // Supervisors still need to observe the exit and commit it.
    wait_idle(pool, Duration::from_secs(5)).await;
}

async fn wait_idle(pool: &Pool, deadline: Duration) -> bool {
    tokio::time::timeout(deadline, async {
        while pool.running_count() > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .is_ok()
}

async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
