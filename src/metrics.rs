//! Performance metrics and statistics tracking for the prediction pipeline.

use crate::types::RiskLabel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Metrics collector for pipeline health and throughput
pub struct PipelineMetrics {
    /// Records decoded and enqueued by the subscriber
    records_ingested: AtomicU64,
    /// Messages dropped for failing to decode
    parse_errors: AtomicU64,
    /// Records scored (including sentinel outcomes)
    records_scored: AtomicU64,
    /// Records that degraded to the sentinel label
    scoring_errors: AtomicU64,
    /// Batches handed to the publisher
    batches_flushed: AtomicU64,
    /// Failed blob uploads
    upload_failures: AtomicU64,
    /// Scored records by risk label
    label_counts: RwLock<HashMap<String, u64>>,
    /// Per-record scoring times (in microseconds)
    scoring_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            records_ingested: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            records_scored: AtomicU64::new(0),
            scoring_errors: AtomicU64::new(0),
            batches_flushed: AtomicU64::new(0),
            upload_failures: AtomicU64::new(0),
            label_counts: RwLock::new(HashMap::new()),
            scoring_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    pub fn record_ingested(&self) {
        self.records_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one scored record with its scoring latency and label.
    pub fn record_scored(&self, scoring_time: Duration, risk: RiskLabel) {
        self.records_scored.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.scoring_times.write() {
            times.push(scoring_time.as_micros() as u64);
            // Keep only recent samples for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Ok(mut counts) = self.label_counts.write() {
            *counts.entry(risk.as_str().to_string()).or_insert(0) += 1;
        }
    }

    pub fn record_scoring_error(&self) {
        self.scoring_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, batch_len: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        info!(
            batch_len = batch_len,
            batches_flushed = self.batches_flushed.load(Ordering::Relaxed),
            "Batch flushed"
        );
    }

    pub fn record_upload_failure(&self) {
        self.upload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_ingested_total(&self) -> u64 {
        self.records_ingested.load(Ordering::Relaxed)
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    pub fn records_scored_total(&self) -> u64 {
        self.records_scored.load(Ordering::Relaxed)
    }

    pub fn scoring_errors(&self) -> u64 {
        self.scoring_errors.load(Ordering::Relaxed)
    }

    pub fn batches_flushed(&self) -> u64 {
        self.batches_flushed.load(Ordering::Relaxed)
    }

    pub fn upload_failures(&self) -> u64 {
        self.upload_failures.load(Ordering::Relaxed)
    }

    pub fn label_counts(&self) -> HashMap<String, u64> {
        self.label_counts.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Get scoring time statistics
    pub fn get_scoring_stats(&self) -> ScoringStats {
        let times = match self.scoring_times.read() {
            Ok(times) => times,
            Err(_) => return ScoringStats::default(),
        };
        if times.is_empty() {
            return ScoringStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ScoringStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (records scored per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let scoring = self.get_scoring_stats();

        info!(
            records_ingested = self.records_ingested_total(),
            parse_errors = self.parse_errors(),
            records_scored = self.records_scored_total(),
            scoring_errors = self.scoring_errors(),
            batches_flushed = self.batches_flushed(),
            upload_failures = self.upload_failures(),
            throughput = format!("{:.1} rec/s", self.get_throughput()),
            mean_scoring_us = scoring.mean_us,
            p99_scoring_us = scoring.p99_us,
            label_counts = ?self.label_counts(),
            "Pipeline summary"
        );
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoring latency statistics
#[derive(Debug, Clone, Default)]
pub struct ScoringStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically logs a metrics summary until cancelled
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {
                    self.metrics.print_summary();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = PipelineMetrics::new();

        metrics.record_ingested();
        metrics.record_ingested();
        metrics.record_parse_error();
        metrics.record_scored(Duration::from_micros(120), RiskLabel::Low);
        metrics.record_scored(Duration::from_micros(80), RiskLabel::Error);
        metrics.record_scoring_error();
        metrics.record_flush(100);
        metrics.record_upload_failure();

        assert_eq!(metrics.records_ingested_total(), 2);
        assert_eq!(metrics.parse_errors(), 1);
        assert_eq!(metrics.records_scored_total(), 2);
        assert_eq!(metrics.scoring_errors(), 1);
        assert_eq!(metrics.batches_flushed(), 1);
        assert_eq!(metrics.upload_failures(), 1);

        let counts = metrics.label_counts();
        assert_eq!(counts.get("0"), Some(&1));
        assert_eq!(counts.get("Error"), Some(&1));
    }

    #[test]
    fn test_scoring_stats() {
        let metrics = PipelineMetrics::new();
        for us in [100u64, 200, 300, 400, 500] {
            metrics.record_scored(Duration::from_micros(us), RiskLabel::Medium);
        }

        let stats = metrics.get_scoring_stats();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean_us, 300);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 500);
    }

    #[test]
    fn test_empty_stats_default() {
        let metrics = PipelineMetrics::new();
        let stats = metrics.get_scoring_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean_us, 0);
    }
}
