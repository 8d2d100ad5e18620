//! Failure Prediction Pipeline Library
//!
//! A real-time medical-device telemetry pipeline: consumes readings from
//! NATS, scores failure risk with a pretrained classifier, batches the
//! scored records, and persists/exports completed batches while exposing
//! the latest batch to an on-demand viewer.

pub mod batcher;
pub mod config;
pub mod feature_extractor;
pub mod intake;
pub mod metrics;
pub mod model;
pub mod publisher;
pub mod scorer;
pub mod slot;
pub mod subscriber;
pub mod types;
pub mod viewer;

pub use batcher::BatchAccumulator;
pub use config::AppConfig;
pub use feature_extractor::FeatureExtractor;
pub use metrics::{MetricsReporter, PipelineMetrics};
pub use model::{Classifier, OnnxClassifier};
pub use publisher::{BatchPublisher, BlobUploader, PredictionLog};
pub use scorer::ScorerAdapter;
pub use slot::LatestBatchSlot;
pub use subscriber::TelemetrySubscriber;
pub use types::{BatchSnapshot, BatchSummary, RiskLabel, ScoredRecord, TelemetryRecord};
pub use viewer::Viewer;
