//! Configuration management for the failure-prediction pipeline

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject carrying device telemetry
    pub telemetry_subject: String,
}

/// Classifier model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX export of the trained pipeline
    pub path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Batching and loop timing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Records per flushed batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Accumulator dequeue timeout in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Metrics summary interval in seconds
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_batch_size() -> usize {
    100
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_metrics_interval_secs() -> u64 {
    30
}

/// Prediction log and blob export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Append-only local prediction log
    pub local_log_path: String,
    /// JetStream object-store bucket for exported batches
    pub bucket: String,
    /// Whether to upload the log after each flush
    #[serde(default = "default_upload_enabled")]
    pub upload_enabled: bool,
}

fn default_upload_enabled() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                telemetry_subject: "iot.failure".to_string(),
            },
            model: ModelConfig {
                path: "models/failure_risk.onnx".to_string(),
                onnx_threads: 1,
            },
            pipeline: PipelineConfig {
                batch_size: 100,
                poll_interval_ms: 500,
                metrics_interval_secs: 30,
            },
            storage: StorageConfig {
                local_log_path: "predictions_output.csv".to_string(),
                bucket: "predictions".to_string(),
                upload_enabled: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.telemetry_subject, "iot.failure");
        assert_eq!(config.pipeline.batch_size, 100);
        assert_eq!(config.storage.bucket, "predictions");
        assert!(config.storage.upload_enabled);
    }

    #[test]
    fn test_load_from_toml() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
[nats]
url = "nats://nats.internal:4222"
telemetry_subject = "devices.telemetry"

[model]
path = "models/custom.onnx"

[pipeline]
batch_size = 25

[storage]
local_log_path = "out.csv"
bucket = "exports"
upload_enabled = false

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.nats.telemetry_subject, "devices.telemetry");
        assert_eq!(config.model.onnx_threads, 1); // default applies
        assert_eq!(config.pipeline.batch_size, 25);
        assert_eq!(config.pipeline.poll_interval_ms, 500); // default applies
        assert!(!config.storage.upload_enabled);
    }
}
