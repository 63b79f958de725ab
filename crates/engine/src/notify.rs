// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent-task notification hook.

use async_trait::async_trait;

/// Downstream notification of a task's lifecycle status.
#[async_trait]
pub trait ParentNotify: Send + Sync {
    async fn notify(&self, parent_url: &str, status: &str);
}

/// Default hook: notification disabled by configuration.
pub struct NoopNotify;

#[async_trait]
impl ParentNotify for NoopNotify {
    async fn notify(&self, parent_url: &str, status: &str) {
        tracing::debug!(parent_url, status, "parent notification disabled");
    }
}

/// POSTs `{"update_data": {"status": ...}}` to `<parent_url>/update`.
/// Enabled with `runtime.task.parent_notify`.
pub struct HttpNotify {
    client: reqwest::Client,
}

impl HttpNotify {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpNotify {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParentNotify for HttpNotify {
    async fn notify(&self, parent_url: &str, status: &str) {
        let url = format!("{}/update", parent_url.trim_end_matches('/'));
        let body = serde_json::json!({ "update_data": { "status": status } });
        match self.client.post(&url).json(&body).send().await {
            Ok(response) => {
                tracing::debug!(url, status = %response.status(), "parent notified")
            }
            Err(e) => tracing::debug!(url, error = %e, "parent notification failed"),
        }
    }
}
