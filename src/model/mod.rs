//! Failure-risk classifier abstraction and backends

pub mod onnx;

pub use onnx::OnnxClassifier;

use anyhow::Result;

/// Output of one classifier call.
#[derive(Debug, Clone, Copy)]
pub struct ClassPrediction {
    /// Predicted class index (0 = low, 1 = medium, 2 = high risk).
    pub class: i64,
    /// Probability of the predicted class, when the model exposes one.
    pub confidence: Option<f64>,
}

/// Call contract for the pretrained failure-risk model.
///
/// Implementations take the ordered feature vector produced by
/// [`crate::feature_extractor::FeatureExtractor`] and return a discrete
/// class. The feature order is fixed at training time; implementations must
/// reject vectors of the wrong arity rather than silently mis-scoring.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &[f32]) -> Result<ClassPrediction>;
}
