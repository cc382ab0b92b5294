//! Classifier collaborator interface
//!
//! The engine treats the trained model as a black-box scorer reached through
//! [`EcgClassifier`]. It never owns weights or a forward-pass implementation;
//! production deployments plug in the ONNX adapter (`ml` feature), tests plug
//! in synthetic scorers.

use crate::error::AnalysisError;
use crate::preprocessing::EcgImage;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cardiac-condition classes the model distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Diagnosis {
    /// Abnormal ECG pattern without MI markers
    Abnormal,
    /// Patterns consistent with a previous myocardial infarction
    #[serde(rename = "MI_History")]
    MiHistory,
    /// Active myocardial infarction
    #[serde(rename = "MI_Patient")]
    MiPatient,
    /// Normal sinus rhythm
    Normal,
}

impl Diagnosis {
    /// Number of classes
    pub const COUNT: usize = 4;

    /// Classes in training order — the order of the model's logit vector
    pub const CLASS_ORDER: [Diagnosis; Diagnosis::COUNT] = [
        Diagnosis::Abnormal,
        Diagnosis::MiHistory,
        Diagnosis::MiPatient,
        Diagnosis::Normal,
    ];

    /// Index of this class in the logit vector
    pub fn index(self) -> usize {
        match self {
            Diagnosis::Abnormal => 0,
            Diagnosis::MiHistory => 1,
            Diagnosis::MiPatient => 2,
            Diagnosis::Normal => 3,
        }
    }

    /// Class label as used in training and in the serialized report
    pub fn label(self) -> &'static str {
        match self {
            Diagnosis::Abnormal => "Abnormal",
            Diagnosis::MiHistory => "MI_History",
            Diagnosis::MiPatient => "MI_Patient",
            Diagnosis::Normal => "Normal",
        }
    }

    /// True for both MI classes (active and historical)
    pub fn is_mi_related(self) -> bool {
        matches!(self, Diagnosis::MiPatient | Diagnosis::MiHistory)
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probability tolerance when validating that class probabilities sum to one
const PROBABILITY_EPSILON: f32 = 1e-3;

/// One classification of one scan
///
/// Immutable; produced once per analysis by the classifier collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted class (argmax of probabilities)
    pub diagnosis: Diagnosis,

    /// Per-class probability, summing to 1
    pub probabilities: BTreeMap<Diagnosis, f32>,

    /// Probability of the predicted class
    pub confidence: f32,
}

impl ClassificationResult {
    /// Build a result from a probability vector in training class order
    ///
    /// The argmax tie-break is the training class order, so repeated runs on
    /// identical probabilities always pick the same class.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ShapeMismatch` if the vector length is not the
    /// class count, or `AnalysisError::InvalidInput` if probabilities do not
    /// sum to 1 within tolerance.
    pub fn from_probabilities(probs: &[f32]) -> Result<Self, AnalysisError> {
        if probs.len() != Diagnosis::COUNT {
            return Err(AnalysisError::ShapeMismatch {
                expected: format!("{} class probabilities", Diagnosis::COUNT),
                got: format!("{}", probs.len()),
            });
        }

        let sum: f32 = probs.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_EPSILON {
            return Err(AnalysisError::InvalidInput(format!(
                "Class probabilities sum to {:.4}, expected 1.0",
                sum
            )));
        }

        let mut best = Diagnosis::CLASS_ORDER[0];
        let mut confidence = probs[0];
        for diagnosis in Diagnosis::CLASS_ORDER {
            let p = probs[diagnosis.index()];
            if p > confidence {
                best = diagnosis;
                confidence = p;
            }
        }

        let probabilities = Diagnosis::CLASS_ORDER
            .iter()
            .map(|&d| (d, probs[d.index()]))
            .collect();

        Ok(Self {
            diagnosis: best,
            probabilities,
            confidence,
        })
    }
}

/// Per-layer self-attention weights from the transformer
///
/// One `(heads, tokens, tokens)` matrix per layer, in layer order. Token 0 is
/// the classification token; the remaining tokens are image patches in
/// row-major order. Owned by the rollout extractor for the duration of one
/// analysis and never persisted.
#[derive(Debug, Clone)]
pub struct AttentionTensor {
    /// Attention weight matrices, one per layer
    pub layers: Vec<Array3<f32>>,
}

impl AttentionTensor {
    /// Check the tensor against the configured classifier geometry
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ShapeMismatch` if the layer count, head
    /// shapes, or token count differ from what the analysis expects. This is
    /// fatal: no partial interpretability is produced from a malformed
    /// tensor.
    pub fn validate(&self, expected_layers: usize, expected_tokens: usize) -> Result<(), AnalysisError> {
        if self.layers.len() != expected_layers {
            return Err(AnalysisError::ShapeMismatch {
                expected: format!("{} attention layers", expected_layers),
                got: format!("{}", self.layers.len()),
            });
        }
        for (i, layer) in self.layers.iter().enumerate() {
            let (_, rows, cols) = layer.dim();
            if rows != expected_tokens || cols != expected_tokens {
                return Err(AnalysisError::ShapeMismatch {
                    expected: format!("{0}x{0} token matrix", expected_tokens),
                    got: format!("{}x{} in layer {}", rows, cols, i),
                });
            }
        }
        Ok(())
    }
}

/// Black-box classifier collaborator
///
/// `Sync` is required because the three saliency estimators run as parallel
/// tasks sharing one classifier reference. Implementations that serialize
/// device access internally (a single GPU queue) still satisfy the contract;
/// in that configuration the engine's parallelism covers only CPU-side work.
pub trait EcgClassifier: Sync {
    /// Forward pass: class probabilities for one image
    fn predict(&self, image: &EcgImage) -> Result<ClassificationResult, AnalysisError>;

    /// Forward pass returning both probabilities and per-layer attention
    fn predict_with_attention(
        &self,
        image: &EcgImage,
    ) -> Result<(ClassificationResult, AttentionTensor), AnalysisError>;

    /// Gradient of the target class logit with respect to the input pixels
    fn class_gradient(
        &self,
        image: &EcgImage,
        target: Diagnosis,
    ) -> Result<Array3<f32>, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_order_matches_index() {
        for (i, d) in Diagnosis::CLASS_ORDER.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }

    #[test]
    fn test_from_probabilities_argmax() {
        let result =
            ClassificationResult::from_probabilities(&[0.05, 0.03, 0.9, 0.02]).unwrap();
        assert_eq!(result.diagnosis, Diagnosis::MiPatient);
        assert!((result.confidence - 0.9).abs() < 1e-6);
        assert_eq!(result.probabilities.len(), Diagnosis::COUNT);
    }

    #[test]
    fn test_from_probabilities_tie_break_is_class_order() {
        // Abnormal comes first in training order, so a tie resolves to it
        let result =
            ClassificationResult::from_probabilities(&[0.4, 0.4, 0.1, 0.1]).unwrap();
        assert_eq!(result.diagnosis, Diagnosis::Abnormal);
    }

    #[test]
    fn test_from_probabilities_rejects_bad_sum() {
        assert!(ClassificationResult::from_probabilities(&[0.5, 0.5, 0.5, 0.5]).is_err());
    }

    #[test]
    fn test_from_probabilities_rejects_wrong_len() {
        assert!(matches!(
            ClassificationResult::from_probabilities(&[1.0]),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_attention_tensor_validation() {
        let tensor = AttentionTensor {
            layers: vec![Array3::zeros((2, 5, 5)); 3],
        };
        assert!(tensor.validate(3, 5).is_ok());
        assert!(tensor.validate(12, 5).is_err());
        assert!(tensor.validate(3, 197).is_err());
    }

    #[test]
    fn test_mi_related() {
        assert!(Diagnosis::MiPatient.is_mi_related());
        assert!(Diagnosis::MiHistory.is_mi_related());
        assert!(!Diagnosis::Abnormal.is_mi_related());
        assert!(!Diagnosis::Normal.is_mi_related());
    }
}
