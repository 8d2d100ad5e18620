//! Feature projection for failure-risk model inference.
//!
//! Projects a telemetry record into the ordered feature vector the trained
//! model expects. The order and encodings here are a versioned contract with
//! the training pipeline; changing either invalidates the model.

use crate::types::telemetry::{location_ordinal, ClimateControl, TelemetryRecord};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;

/// Service dates arrive as day-month-year with dashes.
const SERVICE_DATE_FORMAT: &str = "%d-%m-%Y";

/// Number of features produced per record.
pub const FEATURE_COUNT: usize = 16;

/// Transforms telemetry records into model input features.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Project a record into the model's feature vector.
    ///
    /// `as_of` is the reference date for the engineered `days_since_service`
    /// feature. Errors (unknown location, unparseable service date) are
    /// per-record scoring failures, not pipeline failures.
    pub fn project(&self, record: &TelemetryRecord, as_of: NaiveDate) -> Result<Vec<f32>> {
        let location = location_ordinal(&record.location)
            .ok_or_else(|| anyhow!("unknown location: {}", record.location))?;

        let service_date =
            NaiveDate::parse_from_str(&record.last_service_date, SERVICE_DATE_FORMAT).map_err(
                |e| anyhow!("bad service date {:?}: {}", record.last_service_date, e),
            )?;
        let days_since_service = (as_of - service_date).num_days();

        let climate = match record.climate_control {
            ClimateControl::Yes => 1.0,
            ClimateControl::No => 0.0,
        };

        let mut features = Vec::with_capacity(FEATURE_COUNT);
        features.push(record.device_type.ordinal() as f32);
        features.push(record.runtime_hours as f32);
        features.push(record.temperature_c as f32);
        features.push(record.pressure_kpa as f32);
        features.push(record.vibration_mm_s as f32);
        features.push(record.current_draw_a as f32);
        features.push(record.signal_noise_level as f32);
        features.push(climate);
        features.push(record.humidity_percent as f32);
        features.push(location as f32);
        features.push(record.operational_cycles as f32);
        features.push(record.user_interactions_per_day as f32);
        features.push(record.approx_device_age_years as f32);
        features.push(record.num_repairs as f32);
        features.push(record.error_logs_count as f32);
        features.push(days_since_service as f32);

        Ok(features)
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Feature names in projection order, matching the training contract.
    pub fn feature_names(&self) -> Vec<&'static str> {
        vec![
            "DeviceType",
            "RuntimeHours",
            "TemperatureC",
            "PressureKPa",
            "VibrationMM_S",
            "CurrentDrawA",
            "SignalNoiseLevel",
            "ClimateControl",
            "HumidityPercent",
            "Location",
            "OperationalCycles",
            "UserInteractionsPerDay",
            "ApproxDeviceAgeYears",
            "NumRepairs",
            "ErrorLogsCount",
            "days_since_service",
        ]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
