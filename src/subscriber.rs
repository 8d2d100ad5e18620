//! NATS subscriber feeding the intake queue.
//!
//! Reconnection is the NATS client's responsibility; this loop only decodes
//! what arrives while connected. Malformed payloads are dropped and counted,
//! never fatal.

use crate::intake::IntakeSender;
use crate::metrics::PipelineMetrics;
use crate::types::TelemetryRecord;
use anyhow::{anyhow, Result};
use async_nats::Client;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct TelemetrySubscriber {
    client: Client,
    subject: String,
    intake: IntakeSender,
    metrics: Arc<PipelineMetrics>,
}

impl TelemetrySubscriber {
    pub fn new(
        client: Client,
        subject: &str,
        intake: IntakeSender,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            intake,
            metrics,
        }
    }

    /// Subscribe and pump messages into the intake queue until cancelled or
    /// the subscription ends.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let mut subscription = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to telemetry subject");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    subscription.unsubscribe().await.ok();
                    info!("Subscriber shutting down");
                    break;
                }
                message = subscription.next() => {
                    let Some(message) = message else {
                        warn!("Telemetry subscription ended");
                        break;
                    };
                    if handle_payload(&self.intake, &self.metrics, &message.payload).is_err() {
                        // Intake consumer is gone; nothing left to feed.
                        warn!("Intake queue closed, stopping subscriber");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Decode one payload and enqueue it. A decode failure drops the message and
/// returns Ok; the only error is a closed intake queue.
pub(crate) fn handle_payload(
    intake: &IntakeSender,
    metrics: &PipelineMetrics,
    payload: &[u8],
) -> Result<()> {
    match serde_json::from_slice::<TelemetryRecord>(payload) {
        Ok(record) => {
            if !record.device_type_consistent() {
                warn!(
                    device = %record.device_name,
                    declared = %record.device_type,
                    "Device type disagrees with fleet inventory"
                );
            }
            intake
                .enqueue(record)
                .map_err(|_| anyhow!("intake queue closed"))?;
            metrics.record_ingested();
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Dropping malformed telemetry message");
            metrics.record_parse_error();
            Ok(())
        }
    }
}
