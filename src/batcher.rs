//! Batch accumulator: the ingest-score-batch-flush state machine.
//!
//! Single consumer of the intake queue and sole owner of the in-progress
//! batch. Records are scored and appended in dequeue order; the publisher
//! runs synchronously inside the flush step, so a flushed batch is fully
//! persisted before the next record is accepted.

use crate::intake::{Dequeue, IntakeReceiver};
use crate::publisher::BatchPublisher;
use crate::scorer::ScorerAdapter;
use crate::types::{ScoredRecord, TelemetryRecord};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct BatchAccumulator {
    intake: IntakeReceiver,
    scorer: ScorerAdapter,
    publisher: BatchPublisher,
    batch_size: usize,
    poll_interval: Duration,
    open: Vec<ScoredRecord>,
}

impl BatchAccumulator {
    pub fn new(
        intake: IntakeReceiver,
        scorer: ScorerAdapter,
        publisher: BatchPublisher,
        batch_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            intake,
            scorer,
            publisher,
            batch_size,
            poll_interval,
            open: Vec::with_capacity(batch_size),
        }
    }

    /// Drain the intake queue until cancelled or the producer side closes.
    /// Exits its wait state within one poll interval of cancellation.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Accumulator started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Accumulator shutting down");
                    break;
                }
                dequeued = self.intake.recv(self.poll_interval) => match dequeued {
                    Dequeue::Record(record) => self.ingest(record).await,
                    Dequeue::Empty => {
                        debug!(
                            queue_depth = self.intake.depth(),
                            open_batch = self.open.len(),
                            "Idle tick"
                        );
                    }
                    Dequeue::Closed => {
                        info!("Intake queue closed");
                        break;
                    }
                }
            }
        }

        // Final forced flush: the only batch allowed to be short.
        if !self.open.is_empty() {
            info!(records = self.open.len(), "Flushing open batch on shutdown");
            self.flush().await;
        }
    }

    async fn ingest(&mut self, record: TelemetryRecord) {
        let scored = self.scorer.score(record);
        self.open.push(scored);
        if self.open.len() >= self.batch_size {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        // take() clears the open batch in the same step that hands it off,
        // so no record can land between the handoff and the clear.
        let records = std::mem::take(&mut self.open);
        self.publisher.publish(records).await;
    }
}
