//! Scored records and flushed-batch snapshots

use crate::types::telemetry::TelemetryRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicted failure risk, closed label set.
///
/// `Error` is the sentinel for records whose scoring failed; it is a valid
/// but degenerate outcome, never a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "0")]
    Low,
    #[serde(rename = "1")]
    Medium,
    #[serde(rename = "2")]
    High,
    #[serde(rename = "Error")]
    Error,
}

impl RiskLabel {
    /// Map a classifier class index to a label. Out-of-range classes are
    /// treated as scoring failures.
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            0 => Some(RiskLabel::Low),
            1 => Some(RiskLabel::Medium),
            2 => Some(RiskLabel::High),
            _ => None,
        }
    }

    /// Label as written to the prediction log.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "0",
            RiskLabel::Medium => "1",
            RiskLabel::High => "2",
            RiskLabel::Error => "Error",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A telemetry record with its predicted failure risk appended.
///
/// Created exclusively by the scorer adapter and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: TelemetryRecord,

    #[serde(rename = "PredictedFailureRisk")]
    pub risk: RiskLabel,

    /// Classifier confidence for the predicted class, when the model
    /// exposes probabilities.
    #[serde(rename = "Confidence", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A flushed batch handed to the publisher and the viewer slot.
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    pub batch_id: uuid::Uuid,
    pub flushed_at: DateTime<Utc>,
    pub records: Vec<ScoredRecord>,
}

impl BatchSnapshot {
    pub fn new(records: Vec<ScoredRecord>) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4(),
            flushed_at: Utc::now(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_snapshot(self)
    }
}

/// Per-label counts and record listing for one flushed batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub total: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub errors: usize,
    pub records: Vec<ScoredRecord>,
}

impl BatchSummary {
    pub fn from_snapshot(snapshot: &BatchSnapshot) -> Self {
        let mut summary = Self {
            total: snapshot.records.len(),
            low: 0,
            medium: 0,
            high: 0,
            errors: 0,
            records: snapshot.records.clone(),
        };

        for scored in &snapshot.records {
            match scored.risk {
                RiskLabel::Low => summary.low += 1,
                RiskLabel::Medium => summary.medium += 1,
                RiskLabel::High => summary.high += 1,
                RiskLabel::Error => summary.errors += 1,
            }
        }

        summary
    }

    /// Dashboard text: header counts followed by the raw records.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Total Records: {}\nLow Risk: {}\nMedium Risk: {}\nHigh Risk: {}\n",
            self.total, self.low, self.medium, self.high
        );
        if self.errors > 0 {
            out.push_str(&format!("Scoring Errors: {}\n", self.errors));
        }
        out.push_str("\nLatest Predictions (most recent batch):\n");

        let lines: Vec<String> = self
            .records
            .iter()
            .map(|scored| {
                format!(
                    "{} [{}] @ {} -> risk {}",
                    scored.record.device_name,
                    scored.record.device_type,
                    scored.record.location,
                    scored.risk
                )
            })
            .collect();
        out.push_str(&lines.join("\n"));
        out
    }
}
