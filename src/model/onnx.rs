//! ONNX-backed failure-risk classifier

use crate::model::{ClassPrediction, Classifier};
use anyhow::{anyhow, Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier backed by a single ONNX export of the training pipeline.
///
/// Tree-model exports vary in output layout: the class usually arrives as an
/// int64 `label` tensor, while probabilities come either as an f32 tensor
/// `[1, num_classes]` or as `seq(map(int64, float))`. Both are handled.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    label_output: Option<String>,
    prob_output: Option<String>,
}

impl OnnxClassifier {
    /// Load the model file and resolve its input/output names.
    pub fn load<P: AsRef<Path>>(path: P, intra_threads: usize) -> Result<Self> {
        let path = path.as_ref();

        ort::init().commit()?;
        info!(path = %path.display(), threads = intra_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let prob_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .map(|o| o.name.clone());

        info!(
            input = %input_name,
            label_output = ?label_output,
            prob_output = ?prob_output,
            "Model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_output,
            prob_output,
        })
    }

    /// Argmax over a `[1, num_classes]` or `[num_classes]` probability tensor.
    fn argmax(data: &[f32]) -> Option<(i64, f64)> {
        data.iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, &prob)| (idx as i64, prob as f64))
    }

    /// Argmax over a `seq(map(int64, float))` output, as produced by some
    /// gradient-boosting exports.
    fn argmax_from_sequence_map(output: &ort::value::DynValue) -> Result<(i64, f64)> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let map_value = maps.first().ok_or_else(|| anyhow!("Empty sequence"))?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
        kv_pairs
            .iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|&(class, prob)| (class, prob as f64))
            .ok_or_else(|| anyhow!("No probability found in map"))
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<ClassPrediction> {
        use ort::value::Tensor;

        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        let mut class: Option<i64> = None;
        let mut confidence: Option<f64> = None;

        if let Some(name) = &self.label_output {
            if let Some(output) = outputs.get(name) {
                if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                    class = data.first().copied();
                }
            }
        }

        if let Some(name) = &self.prob_output {
            if let Some(output) = outputs.get(name) {
                if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                    if let Some((argmax_class, prob)) = Self::argmax(data) {
                        class = class.or(Some(argmax_class));
                        confidence = Some(prob);
                    }
                } else if DynSequenceValueType::can_downcast(&output.dtype()) {
                    if let Ok((argmax_class, prob)) = Self::argmax_from_sequence_map(output) {
                        class = class.or(Some(argmax_class));
                        confidence = Some(prob);
                    }
                }
            }
        }

        let class = class.ok_or_else(|| anyhow!("Model produced no usable class output"))?;
        debug!(class = class, confidence = ?confidence, "Inference complete");

        Ok(ClassPrediction { class, confidence })
    }
}
