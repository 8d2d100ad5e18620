//! Type definitions for the failure-prediction pipeline

pub mod scored;
pub mod telemetry;

pub use scored::{BatchSnapshot, BatchSummary, RiskLabel, ScoredRecord};
pub use telemetry::{ClimateControl, DeviceType, TelemetryRecord};
