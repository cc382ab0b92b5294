//! Integrated gradients saliency
//!
//! Attributes the predicted class score to input pixels by integrating the
//! class-logit gradient along the straight-line path from an all-zero
//! baseline to the input image.
//!
//! # Algorithm
//!
//! 1. Interpolate `steps` images between the baseline and the input
//! 2. At each step, obtain the gradient of the target class logit with
//!    respect to the input (one forward+backward pass via the classifier)
//! 3. Average the gradients (Riemann approximation of the path integral)
//! 4. Multiply elementwise by (input - baseline)
//! 5. Sum absolute attributions per lead and rescale to [0, 100]
//!
//! Only attribution magnitude is kept; downstream consensus treats all three
//! signals as importance, not polarity.
//!
//! # Reference
//!
//! Sundararajan, M., Taly, A., & Yan, Q. (2017). Axiomatic Attribution for
//! Deep Networks. *Proceedings of ICML 2017*.

use super::{normalize_grid, LeadScores, SaliencyOutput};
use crate::classifier::{Diagnosis, EcgClassifier};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::leads::LeadMapper;
use crate::preprocessing::EcgImage;
use ndarray::{Array2, Array3, Axis};

/// Compute per-lead integrated-gradients scores for the target class
///
/// Deterministic given a fixed step count: steps are evaluated in order and
/// summed in order, so repeated runs produce bit-identical output.
///
/// # Arguments
///
/// * `image` - Normalized input image (the path endpoint)
/// * `target` - Class whose logit is attributed (the predicted diagnosis)
/// * `classifier` - Collaborator providing forward+gradient passes
/// * `mapper` - Lead partition at input-image resolution
/// * `config` - Step count and geometry
///
/// # Errors
///
/// Returns `AnalysisError::ShapeMismatch` if a gradient tensor does not
/// match the input geometry, or propagates classifier failures unchanged.
pub fn integrated_gradients(
    image: &EcgImage,
    target: Diagnosis,
    classifier: &dyn EcgClassifier,
    mapper: &LeadMapper,
    config: &AnalysisConfig,
) -> Result<SaliencyOutput, AnalysisError> {
    let steps = config.gradient_steps;
    let size = image.size();

    log::debug!(
        "Integrating gradients for {} over {} steps",
        target,
        steps
    );

    let mut accumulated = Array3::<f32>::zeros((3, size, size));

    for k in 1..=steps {
        let alpha = k as f32 / steps as f32;
        let interpolated = image.scaled(alpha);
        let gradient = classifier.class_gradient(&interpolated, target)?;

        if gradient.dim() != (3, size, size) {
            let (c, h, w) = gradient.dim();
            return Err(AnalysisError::ShapeMismatch {
                expected: format!("(3, {0}, {0}) gradient tensor", size),
                got: format!("({}, {}, {})", c, h, w),
            });
        }

        accumulated += &gradient;
    }

    // Average over steps, scale by (input - baseline); the baseline is zero
    // so the path difference is the input itself
    let averaged = accumulated / steps as f32;
    let attributions = &averaged * image.tensor();

    // Magnitude only, channel-summed to one spatial grid
    let attribution_grid: Array2<f32> = attributions.mapv(f32::abs).sum_axis(Axis(0));

    // Per-lead sum of absolute attribution
    let raw = LeadScores::from_fn(|lead| {
        let cell = mapper.cell(lead);
        let mut sum = 0.0;
        for y in cell.y0..cell.y1 {
            for x in cell.x0..cell.x1 {
                sum += attribution_grid[[y, x]];
            }
        }
        sum
    });

    let (scores, degenerate) = match raw.rescaled_0_100() {
        Some(scores) => (scores, false),
        None => {
            log::warn!("Integrated gradients produced a flat map; marking method degenerate");
            (LeadScores::zeros(), true)
        }
    };

    Ok(SaliencyOutput {
        scores,
        degenerate,
        grid: normalize_grid(&attribution_grid),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{AttentionTensor, ClassificationResult};
    use crate::leads::Lead;
    use ndarray::Array3;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Gradient concentrated on one lead's cell, constant across steps
    struct CellGradientClassifier {
        size: usize,
        hot: Lead,
        calls: AtomicUsize,
    }

    impl EcgClassifier for CellGradientClassifier {
        fn predict(&self, _image: &EcgImage) -> Result<ClassificationResult, AnalysisError> {
            ClassificationResult::from_probabilities(&[0.1, 0.1, 0.7, 0.1])
        }

        fn predict_with_attention(
            &self,
            _image: &EcgImage,
        ) -> Result<(ClassificationResult, AttentionTensor), AnalysisError> {
            unimplemented!("not used by the gradient estimator")
        }

        fn class_gradient(
            &self,
            _image: &EcgImage,
            _target: Diagnosis,
        ) -> Result<Array3<f32>, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mapper = LeadMapper::new(self.size, self.size).unwrap();
            let cell = mapper.cell(self.hot);
            let mut grad = Array3::<f32>::zeros((3, self.size, self.size));
            for y in cell.y0..cell.y1 {
                for x in cell.x0..cell.x1 {
                    grad[[0, y, x]] = 2.0;
                }
            }
            Ok(grad)
        }
    }

    fn ones_image(size: usize) -> EcgImage {
        EcgImage::from_tensor(Array3::from_elem((3, size, size), 1.0)).unwrap()
    }

    #[test]
    fn test_hot_cell_dominates() {
        let size = 12;
        let classifier = CellGradientClassifier {
            size,
            hot: Lead::V2,
            calls: AtomicUsize::new(0),
        };
        let mapper = LeadMapper::new(size, size).unwrap();
        let config = AnalysisConfig {
            gradient_steps: 10,
            ..Default::default()
        };

        let output =
            integrated_gradients(&ones_image(size), Diagnosis::MiPatient, &classifier, &mapper, &config)
                .unwrap();

        assert!(!output.degenerate);
        assert_eq!(output.scores.top_k(1), vec![Lead::V2]);
        assert!((output.scores.get(Lead::V2) - 100.0).abs() < 1e-4);
        assert_eq!(output.scores.get(Lead::I), 0.0);
    }

    #[test]
    fn test_one_gradient_pass_per_step() {
        let size = 12;
        let classifier = CellGradientClassifier {
            size,
            hot: Lead::V1,
            calls: AtomicUsize::new(0),
        };
        let mapper = LeadMapper::new(size, size).unwrap();
        let config = AnalysisConfig {
            gradient_steps: 25,
            ..Default::default()
        };

        integrated_gradients(&ones_image(size), Diagnosis::Abnormal, &classifier, &mapper, &config)
            .unwrap();

        assert_eq!(classifier.calls.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn test_zero_gradient_is_degenerate() {
        struct ZeroGradient {
            size: usize,
        }
        impl EcgClassifier for ZeroGradient {
            fn predict(&self, _: &EcgImage) -> Result<ClassificationResult, AnalysisError> {
                ClassificationResult::from_probabilities(&[0.25, 0.25, 0.25, 0.25])
            }
            fn predict_with_attention(
                &self,
                _: &EcgImage,
            ) -> Result<(ClassificationResult, AttentionTensor), AnalysisError> {
                unimplemented!()
            }
            fn class_gradient(
                &self,
                _: &EcgImage,
                _: Diagnosis,
            ) -> Result<Array3<f32>, AnalysisError> {
                Ok(Array3::zeros((3, self.size, self.size)))
            }
        }

        let size = 12;
        let mapper = LeadMapper::new(size, size).unwrap();
        let config = AnalysisConfig {
            gradient_steps: 5,
            ..Default::default()
        };

        let output = integrated_gradients(
            &ones_image(size),
            Diagnosis::Normal,
            &ZeroGradient { size },
            &mapper,
            &config,
        )
        .unwrap();

        assert!(output.degenerate);
    }

    #[test]
    fn test_gradient_shape_mismatch_is_fatal() {
        struct WrongShape;
        impl EcgClassifier for WrongShape {
            fn predict(&self, _: &EcgImage) -> Result<ClassificationResult, AnalysisError> {
                unimplemented!()
            }
            fn predict_with_attention(
                &self,
                _: &EcgImage,
            ) -> Result<(ClassificationResult, AttentionTensor), AnalysisError> {
                unimplemented!()
            }
            fn class_gradient(
                &self,
                _: &EcgImage,
                _: Diagnosis,
            ) -> Result<Array3<f32>, AnalysisError> {
                Ok(Array3::zeros((3, 7, 7)))
            }
        }

        let mapper = LeadMapper::new(12, 12).unwrap();
        let config = AnalysisConfig::default();

        assert!(matches!(
            integrated_gradients(&ones_image(12), Diagnosis::Normal, &WrongShape, &mapper, &config),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
    }
}
