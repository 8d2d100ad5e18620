//! Pull-based viewer over the latest-batch slot.

use crate::slot::LatestBatchSlot;
use crate::types::BatchSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Text returned when no batch has been flushed since the last query.
pub const NO_NEW_PREDICTIONS: &str = "No new predictions yet.";

/// On-demand dashboard query surface. Never errors on an empty slot.
pub struct Viewer {
    slot: Arc<LatestBatchSlot>,
}

impl Viewer {
    pub fn new(slot: Arc<LatestBatchSlot>) -> Self {
        Self { slot }
    }

    /// Sample the slot and summarize the batch, if one is pending.
    pub fn try_sample(&self) -> Option<BatchSummary> {
        self.slot.try_sample().map(|snapshot| snapshot.summary())
    }

    /// Zero-argument "fetch latest" surface: formatted summary text, or an
    /// explicit nothing-new indicator.
    pub fn fetch_latest(&self) -> String {
        match self.try_sample() {
            Some(summary) => summary.render(),
            None => NO_NEW_PREDICTIONS.to_string(),
        }
    }

    /// Periodic dashboard poll. Each tick samples the slot and logs the
    /// summary when a new batch is pending; ticks with nothing new are
    /// silent. Exits within one poll interval of cancellation.
    pub async fn run(self, poll_interval: Duration, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(poll_interval) => {
                    if let Some(summary) = self.try_sample() {
                        info!(
                            total = summary.total,
                            high_risk = summary.high,
                            "Dashboard view:\n{}",
                            summary.render()
                        );
                    }
                }
            }
        }
    }
}
