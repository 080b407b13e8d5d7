//! Combine the statistics and tasks endpoints into one snapshot per cycle.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::http_client::Transport;

use super::{fetch_json, FetchError, RemoteSummary, RemoteTask};

pub const STATISTICS_PATH: &str = "/api/statistics/";
pub const TASKS_PATH: &str = "/api/tasks/";

/// Task status -> number of tasks in that status.
pub type StatusHistogram = BTreeMap<String, u64>;

/// Group tasks by status and count them.
pub fn status_histogram(tasks: &[RemoteTask]) -> StatusHistogram {
    let mut histogram = StatusHistogram::new();
    for task in tasks {
        *histogram.entry(task.status.clone()).or_insert(0) += 1;
    }
    histogram
}

/// One poll cycle's view of the upstream instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub summary: RemoteSummary,
    pub tasks: Vec<RemoteTask>,
}

impl Snapshot {
    /// Whether this snapshot carries data worth publishing.
    ///
    /// A zero character count is taken to mean the statistics fetch failed.
    /// An instance whose documents genuinely contain no text looks the same.
    pub fn is_usable(&self) -> bool {
        self.summary.character_count != 0
    }

    pub fn status_histogram(&self) -> StatusHistogram {
        status_histogram(&self.tasks)
    }
}

/// Connection details for one Paperless instance.
#[derive(Clone)]
pub struct PaperlessApi {
    transport: Arc<dyn Transport>,
    base_url: String,
    token: String,
    host_header: String,
}

impl fmt::Debug for PaperlessApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaperlessApi")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("host_header", &self.host_header)
            .finish()
    }
}

impl PaperlessApi {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        token: &str,
        host_header: &str,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            host_header: host_header.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch `/api/statistics/`.
    pub async fn statistics(&self) -> Result<RemoteSummary, FetchError> {
        let url = self.endpoint(STATISTICS_PATH);
        tracing::debug!("Making request to {}", url);
        fetch_json(self.transport.as_ref(), &url, &self.token, &self.host_header).await
    }

    /// Fetch `/api/tasks/`.
    pub async fn tasks(&self) -> Result<Vec<RemoteTask>, FetchError> {
        let url = self.endpoint(TASKS_PATH);
        tracing::debug!("Making request to {}", url);
        fetch_json(self.transport.as_ref(), &url, &self.token, &self.host_header).await
    }

    /// Build a snapshot. Never fails: a failed statistics fetch yields an
    /// all-zero snapshot, a failed tasks fetch yields the summary alone.
    pub async fn snapshot(&self) -> Snapshot {
        let summary = match self.statistics().await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Failed to get statistics: {}", e);
                return Snapshot::default();
            }
        };

        let tasks = match self.tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!("Failed to get file tasks: {}", e);
                Vec::new()
            }
        };

        Snapshot { summary, tasks }
    }
}
