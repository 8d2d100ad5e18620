//! Scorer adapter wrapping the opaque failure-risk classifier.
//!
//! Scoring is infallible from the pipeline's point of view: any projection
//! or inference error degrades the record to the sentinel label so batching
//! continues.

use crate::feature_extractor::{FeatureExtractor, FEATURE_COUNT};
use crate::metrics::PipelineMetrics;
use crate::model::Classifier;
use crate::types::{RiskLabel, ScoredRecord, TelemetryRecord};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

pub struct ScorerAdapter {
    extractor: FeatureExtractor,
    classifier: Arc<dyn Classifier>,
    metrics: Arc<PipelineMetrics>,
}

impl ScorerAdapter {
    pub fn new(classifier: Arc<dyn Classifier>, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            classifier,
            metrics,
        }
    }

    /// Startup self-check: run one probe prediction so a feature-schema
    /// mismatch with the trained model fails fast instead of surfacing as a
    /// sentinel label on every record.
    pub fn self_check(&self) -> Result<()> {
        let probe = vec![0.0f32; FEATURE_COUNT];
        let prediction = self
            .classifier
            .predict(&probe)
            .context("classifier rejected the configured feature schema")?;

        RiskLabel::from_class(prediction.class).with_context(|| {
            format!(
                "classifier produced class {} outside the risk label set",
                prediction.class
            )
        })?;

        Ok(())
    }

    /// Score one record. Never fails; scoring errors yield the sentinel
    /// label and are counted.
    pub fn score(&self, record: TelemetryRecord) -> ScoredRecord {
        let started = Instant::now();

        let outcome = self
            .extractor
            .project(&record, Utc::now().date_naive())
            .and_then(|features| self.classifier.predict(&features));

        let (risk, confidence) = match outcome {
            Ok(prediction) => match RiskLabel::from_class(prediction.class) {
                Some(risk) => (risk, prediction.confidence),
                None => {
                    warn!(
                        device = %record.device_name,
                        class = prediction.class,
                        "Classifier returned unknown class, using sentinel label"
                    );
                    self.metrics.record_scoring_error();
                    (RiskLabel::Error, None)
                }
            },
            Err(e) => {
                warn!(
                    device = %record.device_name,
                    error = %e,
                    "Scoring failed, using sentinel label"
                );
                self.metrics.record_scoring_error();
                (RiskLabel::Error, None)
            }
        };

        self.metrics.record_scored(started.elapsed(), risk);
        ScoredRecord {
            record,
            risk,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassPrediction;
    use crate::types::telemetry::{ClimateControl, DeviceType};

    struct FixedClassifier(i64);

    impl Classifier for FixedClassifier {
        fn predict(&self, _features: &[f32]) -> Result<ClassPrediction> {
            Ok(ClassPrediction {
                class: self.0,
                confidence: Some(0.9),
            })
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict(&self, _features: &[f32]) -> Result<ClassPrediction> {
            anyhow::bail!("inference backend unavailable")
        }
    }

    fn sample_record() -> TelemetryRecord {
        TelemetryRecord {
            device_type: DeviceType::UltrasoundMachine,
            device_name: "Philips EPIQ".to_string(),
            runtime_hours: 300.0,
            temperature_c: 21.0,
            pressure_kpa: 98.0,
            vibration_mm_s: 0.1,
            current_draw_a: 0.4,
            signal_noise_level: 0.8,
            climate_control: ClimateControl::Yes,
            humidity_percent: 35.0,
            location: "Hospital D - South Region".to_string(),
            operational_cycles: 120,
            user_interactions_per_day: 5.0,
            last_service_date: "02-02-2025".to_string(),
            approx_device_age_years: 1.0,
            num_repairs: 0,
            error_logs_count: 1,
        }
    }

    #[test]
    fn test_score_maps_class_to_label() {
        let metrics = Arc::new(PipelineMetrics::new());
        let scorer = ScorerAdapter::new(Arc::new(FixedClassifier(2)), metrics);

        let scored = scorer.score(sample_record());
        assert_eq!(scored.risk, RiskLabel::High);
        assert_eq!(scored.confidence, Some(0.9));
    }

    #[test]
    fn test_classifier_failure_degrades_to_sentinel() {
        let metrics = Arc::new(PipelineMetrics::new());
        let scorer = ScorerAdapter::new(Arc::new(FailingClassifier), metrics.clone());

        let scored = scorer.score(sample_record());
        assert_eq!(scored.risk, RiskLabel::Error);
        assert_eq!(metrics.scoring_errors(), 1);
    }

    #[test]
    fn test_unknown_class_degrades_to_sentinel() {
        let metrics = Arc::new(PipelineMetrics::new());
        let scorer = ScorerAdapter::new(Arc::new(FixedClassifier(7)), metrics.clone());

        let scored = scorer.score(sample_record());
        assert_eq!(scored.risk, RiskLabel::Error);
        assert_eq!(metrics.scoring_errors(), 1);
    }

    #[test]
    fn test_projection_failure_degrades_to_sentinel() {
        let metrics = Arc::new(PipelineMetrics::new());
        let scorer = ScorerAdapter::new(Arc::new(FixedClassifier(0)), metrics.clone());

        let mut record = sample_record();
        record.last_service_date = "not-a-date".to_string();

        let scored = scorer.score(record);
        assert_eq!(scored.risk, RiskLabel::Error);
        assert_eq!(metrics.scoring_errors(), 1);
    }

    #[test]
    fn test_self_check_passes_for_valid_classifier() {
        let metrics = Arc::new(PipelineMetrics::new());
        let scorer = ScorerAdapter::new(Arc::new(FixedClassifier(0)), metrics);
        assert!(scorer.self_check().is_ok());
    }

    #[test]
    fn test_self_check_fails_on_schema_mismatch() {
        struct ArityChecking;
        impl Classifier for ArityChecking {
            fn predict(&self, features: &[f32]) -> Result<ClassPrediction> {
                anyhow::ensure!(features.len() == 99, "expected 99 features");
                Ok(ClassPrediction {
                    class: 0,
                    confidence: None,
                })
            }
        }

        let metrics = Arc::new(PipelineMetrics::new());
        let scorer = ScorerAdapter::new(Arc::new(ArityChecking), metrics);
        assert!(scorer.self_check().is_err());
    }

    #[test]
    fn test_self_check_fails_on_label_set_mismatch() {
        let metrics = Arc::new(PipelineMetrics::new());
        let scorer = ScorerAdapter::new(Arc::new(FixedClassifier(5)), metrics);
        assert!(scorer.self_check().is_err());
    }
}
