//! ONNX Runtime inference for the ViT ECG classifier
//!
//! Expects a ViT-Base/16 export with two graphs:
//!
//! - The inference graph takes `pixel_values` `(1, 3, 224, 224)` and yields
//!   `logits` `(1, 4)` plus `attentions` `(layers, heads, tokens, tokens)`
//!   (the per-layer self-attention, exported alongside the logits).
//! - An optional gradient graph takes `pixel_values` and `target_class`
//!   `(1,)` and yields `pixel_grad` `(1, 3, 224, 224)`, the gradient of the
//!   target logit with respect to the input.
//!
//! ONNX Runtime sessions are mutated by `run`, so each session sits behind a
//! mutex and forward passes serialize. The engine's estimator fan-out still
//! parallelizes all CPU-side pre/post-processing; this is the serialized-
//! device configuration described in the concurrency notes.

use crate::classifier::{AttentionTensor, ClassificationResult, Diagnosis, EcgClassifier};
use crate::error::AnalysisError;
use crate::preprocessing::EcgImage;
use ndarray::Array3;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;

/// ONNX-backed ECG classifier
pub struct OnnxEcgClassifier {
    inference: Mutex<Session>,
    gradient: Option<Mutex<Session>>,
}

impl OnnxEcgClassifier {
    /// Load the inference graph, and the gradient graph when available
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path to the inference ONNX export
    /// * `gradient_path` - Path to the gradient ONNX export, if the
    ///   deployment ships one; without it integrated gradients cannot run
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ClassifierUnavailable` if a session cannot
    /// be created.
    pub fn load(
        model_path: &Path,
        gradient_path: Option<&Path>,
    ) -> Result<Self, AnalysisError> {
        log::debug!("Loading ECG classifier from {}", model_path.display());

        let inference = Self::build_session(model_path)?;
        let gradient = match gradient_path {
            Some(path) => {
                log::debug!("Loading gradient graph from {}", path.display());
                Some(Mutex::new(Self::build_session(path)?))
            }
            None => {
                log::warn!("No gradient graph configured; integrated gradients will be unavailable");
                None
            }
        };

        Ok(Self {
            inference: Mutex::new(inference),
            gradient,
        })
    }

    fn build_session(path: &Path) -> Result<Session, AnalysisError> {
        Session::builder()
            .and_then(|b| {
                b.with_execution_providers([CPUExecutionProvider::default().build()])
            })
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| {
                AnalysisError::ClassifierUnavailable(format!(
                    "Failed to create ONNX session for {}: {}",
                    path.display(),
                    e
                ))
            })
    }

    /// Flatten the image tensor into `(1, 3, n, n)` shape and data buffers
    fn input_buffers(image: &EcgImage) -> (Vec<usize>, Vec<f32>) {
        let size = image.size();
        let shape = vec![1usize, 3, size, size];
        let data: Vec<f32> = image.tensor().iter().copied().collect();
        (shape, data)
    }

    fn softmax(logits: &[f32]) -> Vec<f32> {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
        let sum: f32 = exp.iter().sum();
        exp.iter().map(|&e| e / sum).collect()
    }

    fn run_inference(
        &self,
        image: &EcgImage,
        want_attention: bool,
    ) -> Result<(ClassificationResult, Option<AttentionTensor>), AnalysisError> {
        let (shape, data) = Self::input_buffers(image);
        let input = ort::value::Value::from_array((shape.as_slice(), data))
            .map_err(|e| AnalysisError::ClassifierUnavailable(format!("Input tensor: {}", e)))?;
        let mut session = self
            .inference
            .lock()
            .map_err(|_| AnalysisError::ClassifierUnavailable("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs!["pixel_values" => input])
            .map_err(|e| AnalysisError::ClassifierUnavailable(format!("Forward pass: {}", e)))?;

        let (logits_shape, logits_data) = outputs["logits"]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalysisError::ClassifierUnavailable(format!("Logits output: {}", e)))?;
        let class_count: usize = logits_shape.iter().map(|&d| d as usize).product();
        if class_count != Diagnosis::COUNT {
            return Err(AnalysisError::ShapeMismatch {
                expected: format!("{} logits", Diagnosis::COUNT),
                got: format!("{}", class_count),
            });
        }

        let classification =
            ClassificationResult::from_probabilities(&Self::softmax(logits_data))?;

        let attention = if want_attention {
            let (shape, data) = outputs["attentions"]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    AnalysisError::ClassifierUnavailable(format!("Attention output: {}", e))
                })?;
            if shape.len() != 4 {
                return Err(AnalysisError::ShapeMismatch {
                    expected: "(layers, heads, tokens, tokens) attention".to_string(),
                    got: format!("{} dims", shape.len()),
                });
            }
            let (layers, heads, rows, cols) = (
                shape[0] as usize,
                shape[1] as usize,
                shape[2] as usize,
                shape[3] as usize,
            );
            let per_layer = heads * rows * cols;
            let layer_tensors = (0..layers)
                .map(|l| {
                    Array3::from_shape_vec(
                        (heads, rows, cols),
                        data[l * per_layer..(l + 1) * per_layer].to_vec(),
                    )
                    .map_err(|e| AnalysisError::ProcessingError(format!("Attention layout: {}", e)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(AttentionTensor {
                layers: layer_tensors,
            })
        } else {
            None
        };

        Ok((classification, attention))
    }
}

impl EcgClassifier for OnnxEcgClassifier {
    fn predict(&self, image: &EcgImage) -> Result<ClassificationResult, AnalysisError> {
        self.run_inference(image, false).map(|(c, _)| c)
    }

    fn predict_with_attention(
        &self,
        image: &EcgImage,
    ) -> Result<(ClassificationResult, AttentionTensor), AnalysisError> {
        let (classification, attention) = self.run_inference(image, true)?;
        let attention = attention.ok_or_else(|| {
            AnalysisError::ClassifierUnavailable("Attention output missing".to_string())
        })?;
        Ok((classification, attention))
    }

    fn class_gradient(
        &self,
        image: &EcgImage,
        target: Diagnosis,
    ) -> Result<Array3<f32>, AnalysisError> {
        let gradient = self.gradient.as_ref().ok_or_else(|| {
            AnalysisError::ClassifierUnavailable(
                "No gradient graph configured for this deployment".to_string(),
            )
        })?;

        let (shape, data) = Self::input_buffers(image);
        let input = ort::value::Value::from_array((shape.as_slice(), data))
            .map_err(|e| AnalysisError::ClassifierUnavailable(format!("Input tensor: {}", e)))?;
        let target_value =
            ort::value::Value::from_array(([1usize].as_slice(), vec![target.index() as i64]))
                .map_err(|e| AnalysisError::ClassifierUnavailable(format!("Target tensor: {}", e)))?;

        let mut session = gradient
            .lock()
            .map_err(|_| AnalysisError::ClassifierUnavailable("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs!["pixel_values" => input, "target_class" => target_value])
            .map_err(|e| AnalysisError::ClassifierUnavailable(format!("Backward pass: {}", e)))?;

        let (shape, data) = outputs["pixel_grad"]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalysisError::ClassifierUnavailable(format!("Gradient output: {}", e)))?;

        let size = image.size();
        let expected_len = 3 * size * size;
        let got_len: usize = shape.iter().map(|&d| d as usize).product();
        if got_len != expected_len {
            return Err(AnalysisError::ShapeMismatch {
                expected: format!("(1, 3, {0}, {0}) gradient", size),
                got: format!("{:?}", shape),
            });
        }

        Array3::from_shape_vec((3, size, size), data.to_vec())
            .map_err(|e| AnalysisError::ProcessingError(format!("Gradient layout: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = OnnxEcgClassifier::softmax(&[2.0, 1.0, 0.5, -1.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_softmax_is_shift_invariant() {
        let a = OnnxEcgClassifier::softmax(&[1.0, 2.0, 3.0, 4.0]);
        let b = OnnxEcgClassifier::softmax(&[101.0, 102.0, 103.0, 104.0]);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }
}
