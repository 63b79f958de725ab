// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared daemon context threaded through every request handler.

use pp_core::Config;
use pp_engine::Pool;
use pp_storage::TaskRepo;
use std::sync::Arc;

pub struct AppContext {
    pub config: Arc<Config>,
    pub repo: Arc<TaskRepo>,
    pub pool: Pool,
}

impl AppContext {
    pub fn new(config: Arc<Config>, repo: Arc<TaskRepo>, pool: Pool) -> Self {
        Self { config, repo, pool }
    }
}
