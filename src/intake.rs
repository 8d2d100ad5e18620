//! Intake queue decoupling transport delivery from scoring.
//!
//! Unbounded single-producer/single-consumer FIFO. Enqueue never blocks and
//! never drops; unbounded growth under sustained overload is a deliberate,
//! monitored simplification (queue depth is logged on idle ticks).

use crate::types::TelemetryRecord;
use anyhow::{anyhow, Result};
use std::time::Duration;
use tokio::sync::mpsc;

/// Create a connected intake queue pair.
pub fn intake_queue() -> (IntakeSender, IntakeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IntakeSender { tx }, IntakeReceiver { rx })
}

/// Producer side, held by the subscriber.
#[derive(Clone)]
pub struct IntakeSender {
    tx: mpsc::UnboundedSender<TelemetryRecord>,
}

impl IntakeSender {
    /// Enqueue a record without blocking. Fails only when the consumer has
    /// shut down.
    pub fn enqueue(&self, record: TelemetryRecord) -> Result<()> {
        self.tx
            .send(record)
            .map_err(|_| anyhow!("intake queue closed"))
    }
}

/// Outcome of a timed dequeue.
#[derive(Debug)]
pub enum Dequeue {
    Record(TelemetryRecord),
    /// Nothing arrived within the poll interval.
    Empty,
    /// Producer side is gone and the queue is drained.
    Closed,
}

/// Consumer side, owned by the batch accumulator.
pub struct IntakeReceiver {
    rx: mpsc::UnboundedReceiver<TelemetryRecord>,
}

impl IntakeReceiver {
    /// Non-blocking dequeue.
    pub fn try_dequeue(&mut self) -> Option<TelemetryRecord> {
        self.rx.try_recv().ok()
    }

    /// Blocking dequeue with timeout; the accumulator's wait step.
    pub async fn recv(&mut self, wait: Duration) -> Dequeue {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(record)) => Dequeue::Record(record),
            Ok(None) => Dequeue::Closed,
            Err(_) => Dequeue::Empty,
        }
    }

    /// Pending records, for depth logging.
    pub fn depth(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::telemetry::{ClimateControl, DeviceType};

    fn record(name: &str) -> TelemetryRecord {
        TelemetryRecord {
            device_type: DeviceType::InfusionPump,
            device_name: name.to_string(),
            runtime_hours: 1.0,
            temperature_c: 20.0,
            pressure_kpa: 100.0,
            vibration_mm_s: 0.1,
            current_draw_a: 0.2,
            signal_noise_level: 0.5,
            climate_control: ClimateControl::No,
            humidity_percent: 30.0,
            location: "Hospital A - Central Region".to_string(),
            operational_cycles: 10,
            user_interactions_per_day: 2.0,
            last_service_date: "01-01-2025".to_string(),
            approx_device_age_years: 0.5,
            num_repairs: 0,
            error_logs_count: 0,
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = intake_queue();

        tx.enqueue(record("a")).unwrap();
        tx.enqueue(record("b")).unwrap();
        tx.enqueue(record("c")).unwrap();

        assert_eq!(rx.depth(), 3);
        assert_eq!(rx.try_dequeue().unwrap().device_name, "a");
        assert_eq!(rx.try_dequeue().unwrap().device_name, "b");
        assert_eq!(rx.try_dequeue().unwrap().device_name, "c");
        assert!(rx.try_dequeue().is_none());
    }

    #[tokio::test]
    async fn test_recv_times_out_when_empty() {
        let (_tx, mut rx) = intake_queue();
        match rx.recv(Duration::from_millis(10)).await {
            Dequeue::Empty => {}
            other => panic!("expected Empty, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recv_reports_closed() {
        let (tx, mut rx) = intake_queue();
        tx.enqueue(record("last")).unwrap();
        drop(tx);

        match rx.recv(Duration::from_millis(10)).await {
            Dequeue::Record(r) => assert_eq!(r.device_name, "last"),
            other => panic!("expected Record, got {:?}", other),
        }
        match rx.recv(Duration::from_millis(10)).await {
            Dequeue::Closed => {}
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_enqueue_fails_after_consumer_drop() {
        let (tx, rx) = intake_queue();
        drop(rx);
        assert!(tx.enqueue(record("x")).is_err());
    }
}
