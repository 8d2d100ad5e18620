//! Batch persistence and export.
//!
//! On each flush: append the records to the local prediction log (header
//! written once on first-ever write), upload the accumulated log as a
//! timestamp-named blob, and hand a snapshot to the viewer slot. Upload
//! failures are logged and counted; the local log remains the durable
//! source of truth.

use crate::metrics::PipelineMetrics;
use crate::slot::LatestBatchSlot;
use crate::types::{BatchSnapshot, ScoredRecord};
use anyhow::{Context, Result};
use async_nats::jetstream::{self, object_store};
use async_nats::Client;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// Column order of the prediction log: the wire schema plus the appended
/// prediction column.
const CSV_HEADER: &str = "DeviceType,DeviceName,RuntimeHours,TemperatureC,PressureKPa,\
VibrationMM_S,CurrentDrawA,SignalNoiseLevel,ClimateControl,HumidityPercent,Location,\
OperationalCycles,UserInteractionsPerDay,LastServiceDate,ApproxDeviceAgeYears,NumRepairs,\
ErrorLogsCount,PredictedFailureRisk";

fn csv_row(scored: &ScoredRecord) -> String {
    let r = &scored.record;
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        r.device_type,
        r.device_name,
        r.runtime_hours,
        r.temperature_c,
        r.pressure_kpa,
        r.vibration_mm_s,
        r.current_draw_a,
        r.signal_noise_level,
        r.climate_control,
        r.humidity_percent,
        r.location,
        r.operational_cycles,
        r.user_interactions_per_day,
        r.last_service_date,
        r.approx_device_age_years,
        r.num_repairs,
        r.error_logs_count,
        scored.risk,
    )
}

/// Deterministic blob name for one flush, second resolution.
pub fn blob_name(flushed_at: DateTime<Utc>) -> String {
    format!("predictions_{}.csv", flushed_at.format("%Y%m%d_%H%M%S"))
}

/// Append-only local prediction log.
pub struct PredictionLog {
    path: PathBuf,
}

impl PredictionLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Append one row per record, writing the header if the log does not
    /// exist yet.
    pub async fn append(&self, records: &[ScoredRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let exists = tokio::fs::try_exists(&self.path).await.unwrap_or(false);

        let mut out = String::new();
        if !exists {
            out.push_str(CSV_HEADER);
            out.push('\n');
        }
        for scored in records {
            out.push_str(&csv_row(scored));
            out.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open prediction log {:?}", self.path))?;
        file.write_all(out.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Full log contents, for blob upload.
    pub async fn read_all(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read prediction log {:?}", self.path))
    }
}

/// Uploads the prediction log to a JetStream object-store bucket.
pub struct BlobUploader {
    store: object_store::ObjectStore,
}

impl BlobUploader {
    /// Resolve the bucket, creating it if it does not exist.
    pub async fn connect(client: &Client, bucket: &str) -> Result<Self> {
        let js = jetstream::new(client.clone());
        let store = match js.get_object_store(bucket).await {
            Ok(store) => store,
            Err(_) => js
                .create_object_store(object_store::Config {
                    bucket: bucket.to_string(),
                    ..Default::default()
                })
                .await
                .with_context(|| format!("Failed to create object-store bucket {:?}", bucket))?,
        };
        info!(bucket = %bucket, "Object-store bucket ready");
        Ok(Self { store })
    }

    pub async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.store
            .put(name, &mut bytes.as_slice())
            .await
            .with_context(|| format!("Failed to upload blob {:?}", name))?;
        Ok(())
    }
}

/// Persists flushed batches and hands snapshots to the viewer slot.
pub struct BatchPublisher {
    log: PredictionLog,
    uploader: Option<BlobUploader>,
    slot: Arc<LatestBatchSlot>,
    metrics: Arc<PipelineMetrics>,
}

impl BatchPublisher {
    pub fn new(
        log: PredictionLog,
        uploader: Option<BlobUploader>,
        slot: Arc<LatestBatchSlot>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            log,
            uploader,
            slot,
            metrics,
        }
    }

    /// Persist and export one flushed batch. Storage failures are logged
    /// and counted; the slot handoff always happens.
    pub async fn publish(&self, records: Vec<ScoredRecord>) {
        let snapshot = BatchSnapshot::new(records);
        let batch_id = snapshot.batch_id;
        let batch_len = snapshot.len();

        match self.log.append(&snapshot.records).await {
            Ok(()) => {
                if let Some(uploader) = &self.uploader {
                    self.upload_log(snapshot.flushed_at, uploader).await;
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to append batch to prediction log");
            }
        }

        // Slot handoff happens before the flush counter moves, so anyone
        // observing the counter sees this batch, not the previous one.
        self.slot.publish(snapshot);
        self.metrics.record_flush(batch_len);
        info!(batch_id = %batch_id, records = batch_len, "Batch published");
    }

    async fn upload_log(&self, flushed_at: DateTime<Utc>, uploader: &BlobUploader) {
        let name = blob_name(flushed_at);
        let outcome = match self.log.read_all().await {
            Ok(bytes) => uploader.upload(&name, bytes).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => info!(blob = %name, "Uploaded prediction log"),
            Err(e) => {
                // Next flush retries under a fresh name; the local log stays
                // authoritative.
                warn!(blob = %name, error = %e, "Upload failed");
                self.metrics.record_upload_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::telemetry::{ClimateControl, DeviceType, TelemetryRecord};
    use crate::types::RiskLabel;

    fn scored(name: &str, risk: RiskLabel) -> ScoredRecord {
        ScoredRecord {
            record: TelemetryRecord {
                device_type: DeviceType::AnesthesiaMachine,
                device_name: name.to_string(),
                runtime_hours: 55.5,
                temperature_c: 20.1,
                pressure_kpa: 100.4,
                vibration_mm_s: 0.15,
                current_draw_a: 0.6,
                signal_noise_level: 1.2,
                climate_control: ClimateControl::Yes,
                humidity_percent: 44.0,
                location: "Hospital B - South Region".to_string(),
                operational_cycles: 33,
                user_interactions_per_day: 4.5,
                last_service_date: "11-11-2024".to_string(),
                approx_device_age_years: 3.3,
                num_repairs: 1,
                error_logs_count: 5,
            },
            risk,
            confidence: None,
        }
    }

    #[test]
    fn test_blob_name_format() {
        let ts = DateTime::parse_from_rfc3339("2025-06-01T12:34:56Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(blob_name(ts), "predictions_20250601_123456.csv");
    }

    #[test]
    fn test_csv_row_column_order() {
        let row = csv_row(&scored("GE Aisys", RiskLabel::Medium));
        assert!(row.starts_with("Anesthesia Machine,GE Aisys,55.5,"));
        assert!(row.ends_with(",1"));
        assert_eq!(row.split(',').count(), CSV_HEADER.split(',').count());
    }

    #[tokio::test]
    async fn test_log_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::new(dir.path().join("predictions.csv"));

        log.append(&[scored("a", RiskLabel::Low)]).await.unwrap();
        log.append(&[scored("b", RiskLabel::High)]).await.unwrap();

        let contents = String::from_utf8(log.read_all().await.unwrap()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].contains(",a,"));
        assert!(lines[2].contains(",b,"));
        assert_eq!(
            contents.matches("DeviceType,DeviceName").count(),
            1,
            "header must appear exactly once"
        );
    }

    #[tokio::test]
    async fn test_empty_append_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        let log = PredictionLog::new(path.clone());

        log.append(&[]).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_publish_writes_log_and_slot() {
        let dir = tempfile::tempdir().unwrap();
        let slot = Arc::new(LatestBatchSlot::new());
        let metrics = Arc::new(PipelineMetrics::new());
        let publisher = BatchPublisher::new(
            PredictionLog::new(dir.path().join("predictions.csv")),
            None,
            slot.clone(),
            metrics.clone(),
        );

        publisher
            .publish(vec![
                scored("a", RiskLabel::Low),
                scored("b", RiskLabel::Error),
            ])
            .await;

        let snapshot = slot.try_sample().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(metrics.batches_flushed(), 1);

        let contents = String::from_utf8(
            tokio::fs::read(dir.path().join("predictions.csv")).await.unwrap(),
        )
        .unwrap();
        assert!(contents.ends_with(",Error\n"));
    }

    #[tokio::test]
    async fn test_log_failure_still_hands_off_snapshot() {
        // A directory path makes the log append fail.
        let dir = tempfile::tempdir().unwrap();
        let slot = Arc::new(LatestBatchSlot::new());
        let metrics = Arc::new(PipelineMetrics::new());
        let publisher = BatchPublisher::new(
            PredictionLog::new(dir.path()),
            None,
            slot.clone(),
            metrics.clone(),
        );

        publisher.publish(vec![scored("a", RiskLabel::Low)]).await;

        assert!(slot.try_sample().is_some());
        assert_eq!(metrics.batches_flushed(), 1);
    }
}
