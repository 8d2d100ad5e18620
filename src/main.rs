//! Failure Prediction Pipeline - Main Entry Point
//!
//! Consumes device telemetry from NATS, scores each reading with a
//! pretrained ONNX failure-risk model, and batches, persists, and exports
//! the predictions.

use anyhow::{Context, Result};
use failure_prediction_pipeline::{
    batcher::BatchAccumulator,
    config::AppConfig,
    intake::intake_queue,
    metrics::{MetricsReporter, PipelineMetrics},
    model::OnnxClassifier,
    publisher::{BatchPublisher, BlobUploader, PredictionLog},
    scorer::ScorerAdapter,
    slot::LatestBatchSlot,
    subscriber::TelemetrySubscriber,
    viewer::Viewer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                format!("failure_prediction_pipeline={}", config.logging.level).parse()?,
            ),
        )
        .init();

    info!("Starting Failure Prediction Pipeline");
    info!(
        subject = %config.nats.telemetry_subject,
        batch_size = config.pipeline.batch_size,
        model = %config.model.path,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Load the classifier and verify the feature contract before touching
    // the transport; a schema mismatch is a startup failure, not a
    // per-record surprise.
    let classifier = Arc::new(OnnxClassifier::load(
        &config.model.path,
        config.model.onnx_threads,
    )?);
    let scorer = ScorerAdapter::new(classifier, metrics.clone());
    scorer
        .self_check()
        .context("Classifier feature-schema self-check failed")?;
    info!("Classifier self-check passed");

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let uploader = if config.storage.upload_enabled {
        match BlobUploader::connect(&client, &config.storage.bucket).await {
            Ok(uploader) => Some(uploader),
            Err(e) => {
                warn!(error = %e, "Object store unavailable, uploads disabled");
                None
            }
        }
    } else {
        info!("Blob upload disabled by configuration");
        None
    };

    // Hand-off points between the tasks
    let (intake_tx, intake_rx) = intake_queue();
    let slot = Arc::new(LatestBatchSlot::new());

    let publisher = BatchPublisher::new(
        PredictionLog::new(config.storage.local_log_path.clone()),
        uploader,
        slot.clone(),
        metrics.clone(),
    );

    let shutdown = CancellationToken::new();

    let subscriber = TelemetrySubscriber::new(
        client,
        &config.nats.telemetry_subject,
        intake_tx,
        metrics.clone(),
    );
    let subscriber_task = tokio::spawn(subscriber.run(shutdown.clone()));

    let accumulator = BatchAccumulator::new(
        intake_rx,
        scorer,
        publisher,
        config.pipeline.batch_size,
        Duration::from_millis(config.pipeline.poll_interval_ms),
    );
    let accumulator_task = tokio::spawn(accumulator.run(shutdown.clone()));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    let reporter_task = tokio::spawn(reporter.run(shutdown.clone()));

    // Dashboard poll: logs each flushed batch's summary as it appears.
    let viewer_task = tokio::spawn(Viewer::new(slot.clone()).run(
        Duration::from_millis(config.pipeline.poll_interval_ms),
        shutdown.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    shutdown.cancel();

    match subscriber_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Subscriber exited with error"),
        Err(e) => error!(error = %e, "Subscriber task failed"),
    }
    accumulator_task.await.ok();
    reporter_task.await.ok();
    viewer_task.await.ok();

    // Surface anything flushed but never sampled by the dashboard, such as
    // the force-flushed open batch.
    info!("Final dashboard view:\n{}", Viewer::new(slot).fetch_latest());
    metrics.print_summary();

    Ok(())
}
