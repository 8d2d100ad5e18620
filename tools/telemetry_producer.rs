//! Test Telemetry Producer
//!
//! Generates and publishes simulated device telemetry to NATS for pipeline
//! testing. Cycles through the fleet inventory with readings in realistic
//! ranges.

use chrono::Utc;
use failure_prediction_pipeline::types::telemetry::{
    ClimateControl, TelemetryRecord, DEVICE_MAPPING, LOCATIONS,
};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Telemetry generator cycling through the fleet inventory
struct TelemetryGenerator {
    rng: rand::rngs::ThreadRng,
    device_index: usize,
}

impl TelemetryGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            device_index: 0,
        }
    }

    /// Generate a reading for the next device in the fleet
    fn generate(&mut self) -> TelemetryRecord {
        let (device_name, device_type) = DEVICE_MAPPING[self.device_index % DEVICE_MAPPING.len()];
        self.device_index += 1;

        TelemetryRecord {
            device_type,
            device_name: device_name.to_string(),
            runtime_hours: round2(self.rng.gen_range(102.32..9999.85)),
            temperature_c: round2(self.rng.gen_range(16.07..40.0)),
            pressure_kpa: round2(self.rng.gen_range(90.0..120.0)),
            vibration_mm_s: round3(self.rng.gen_range(0.0..1.0)),
            current_draw_a: round3(self.rng.gen_range(0.1..1.5)),
            signal_noise_level: round2(self.rng.gen_range(0.0..5.0)),
            climate_control: if self.rng.gen_bool(0.5) {
                ClimateControl::Yes
            } else {
                ClimateControl::No
            },
            humidity_percent: round2(self.rng.gen_range(20.0..70.0)),
            location: LOCATIONS[self.rng.gen_range(0..LOCATIONS.len())].to_string(),
            operational_cycles: self.rng.gen_range(5..11887),
            user_interactions_per_day: round2(self.rng.gen_range(0.0..26.4)),
            last_service_date: self.random_service_date(),
            approx_device_age_years: round2(self.rng.gen_range(0.1..35.89)),
            num_repairs: self.rng.gen_range(0..19),
            error_logs_count: self.rng.gen_range(0..22),
        }
    }

    /// Generate a reading the scorer cannot project (unknown location), to
    /// exercise the sentinel-label path downstream.
    fn generate_unscoreable(&mut self) -> TelemetryRecord {
        let mut record = self.generate();
        record.location = "Field Clinic - Unmapped".to_string();
        record
    }

    /// Service date within the last two years, `DD-MM-YYYY`
    fn random_service_date(&mut self) -> String {
        let days_ago = self.rng.gen_range(0..730);
        let date = Utc::now() - chrono::Duration::days(days_ago);
        date.format("%d-%m-%Y").to_string()
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telemetry_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Telemetry Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("iot.failure");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let unscoreable_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(1000);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        unscoreable_rate = unscoreable_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    };

    let mut generator = TelemetryGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} readings...", count);

    for i in 0..count {
        let record = if rng.gen_bool(unscoreable_rate) {
            generator.generate_unscoreable()
        } else {
            generator.generate()
        };

        let payload = serde_json::to_vec(&record)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 24 == 0 {
            info!("Published {}/{} readings", i + 1, count);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Published {} readings", count);

    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TelemetryGenerator::new();

    for i in 0..count {
        let record = generator.generate();
        let json = serde_json::to_string_pretty(&record)?;

        if (i + 1) % 24 == 0 || i == 0 {
            info!("Sample reading {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
