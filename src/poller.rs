//! Poll loop: fetch a snapshot, publish it if usable, sleep, repeat.
//!
//! Every unusable snapshot counts as a failure. The counter is never reset, so
//! six failures in total (not necessarily in a row) stop the loop and the
//! process is expected to exit and be restarted by its supervisor.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::metrics::PaperlessMetrics;
use crate::paperless::PaperlessApi;

/// Failures tolerated before giving up. The loop stops once the count goes
/// above this value.
pub const MAX_FAILURES: u32 = 5;

/// Result of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published,
    Skipped,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// The cancellation token fired.
    Cancelled,
    /// The failure counter went above [`MAX_FAILURES`].
    TooManyFailures { failures: u32 },
}

pub struct Poller {
    api: PaperlessApi,
    metrics: Arc<PaperlessMetrics>,
    interval: Duration,
    failures: u32,
}

impl Poller {
    pub fn new(api: PaperlessApi, metrics: Arc<PaperlessMetrics>, interval: Duration) -> Self {
        Self {
            api,
            metrics,
            interval,
            failures: 0,
        }
    }

    /// Failures counted since the poller was created.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn exceeded_failure_limit(&self) -> bool {
        self.failures > MAX_FAILURES
    }

    /// Run one fetch + publish cycle.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let snapshot = self.api.snapshot().await;

        tracing::debug!(
            documents_total = snapshot.summary.documents_total,
            documents_inbox = snapshot.summary.documents_inbox,
            character_count = snapshot.summary.character_count,
            tasks = snapshot.tasks.len(),
            "Got statistics from Paperless"
        );

        if snapshot.is_usable() {
            self.metrics.publish(&snapshot);
            CycleOutcome::Published
        } else {
            self.failures += 1;
            tracing::warn!(
                "Skipping metrics update, no usable statistics (failure count: {})",
                self.failures
            );
            CycleOutcome::Skipped
        }
    }

    /// Poll until cancelled or until too many cycles have failed.
    pub async fn run(mut self, cancel: CancellationToken) -> PollExit {
        tracing::info!(
            "Polling {} every {}s",
            self.api.base_url(),
            self.interval.as_secs()
        );

        loop {
            if cancel.is_cancelled() {
                return PollExit::Cancelled;
            }

            self.poll_once().await;

            if self.exceeded_failure_limit() {
                tracing::error!("Too many failures ({}), giving up", self.failures);
                return PollExit::TooManyFailures {
                    failures: self.failures,
                };
            }

            tokio::select! {
                _ = cancel.cancelled() => return PollExit::Cancelled,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Run the loop on its own task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<PollExit> {
        tokio::spawn(self.run(cancel))
    }
}
