//! # Cardiolens
//!
//! An ECG interpretability and consensus-scoring engine. Cardiolens takes a
//! classified ECG image and explains *why* the classifier reached its verdict
//! by combining three structurally different saliency methods into one
//! deterministic, auditable consensus report:
//!
//! - **Attention rollout**: transformer self-attention flattened across all
//!   layers into a spatial saliency map
//! - **Integrated gradients**: class-logit attribution integrated along a
//!   baseline-to-input path
//! - **Ablation impact**: per-lead confidence delta under masking
//!
//! The classifier itself is a black-box collaborator reached through the
//! [`EcgClassifier`] trait; the engine never owns model weights.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cardiolens::{
//!     analyze, AnalysisConfig, AnalysisError, AttentionTensor, ClassificationResult,
//!     Diagnosis, EcgClassifier, EcgImage,
//! };
//! use ndarray::Array3;
//!
//! /// Adapter around whatever runtime serves the trained model
//! struct RemoteClassifier;
//!
//! impl EcgClassifier for RemoteClassifier {
//!     fn predict(&self, image: &EcgImage) -> Result<ClassificationResult, AnalysisError> {
//!         todo!("forward pass")
//!     }
//!     fn predict_with_attention(
//!         &self,
//!         image: &EcgImage,
//!     ) -> Result<(ClassificationResult, AttentionTensor), AnalysisError> {
//!         todo!("forward pass with attention outputs")
//!     }
//!     fn class_gradient(
//!         &self,
//!         image: &EcgImage,
//!         target: Diagnosis,
//!     ) -> Result<Array3<f32>, AnalysisError> {
//!         todo!("backward pass")
//!     }
//! }
//!
//! let image_bytes = std::fs::read("scan.png")?;
//! let report = analyze(&image_bytes, &RemoteClassifier, &AnalysisConfig::default())?;
//!
//! println!("Diagnosis: {} (confidence {:.2})", report.diagnosis, report.confidence);
//! println!(
//!     "Risk: {:?}, consensus: {:?}",
//!     report.risk_level, report.interpretability.consensus_level
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The analysis pipeline follows this flow:
//!
//! ```text
//! Image -> Classifier -> (probabilities, attention)
//!            |-> Attention Rollout  --\
//!            |-> Integrated Gradients --+-> Consensus -> Risk & Report
//!            |-> Ablation Impact     --/
//! ```
//!
//! The three estimators are read-independent and run as parallel tasks
//! joined before reconciliation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod error;
pub mod interpret;
pub mod leads;
pub mod preprocessing;

#[cfg(feature = "ml")]
pub mod ml;

// Re-export main types
pub use analysis::interpretation::ClinicalInterpretation;
pub use analysis::result::{AnalysisReport, LeadAssessment, SaliencyGrids};
pub use analysis::risk::RiskLevel;
pub use classifier::{AttentionTensor, ClassificationResult, Diagnosis, EcgClassifier};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use interpret::consensus::{ConsensusLevel, ImportanceTier};
pub use leads::{Lead, LeadMapper, Territory};
pub use preprocessing::EcgImage;

use interpret::{ablation, consensus, gradients, rollout};

/// Analyze an uploaded ECG scan
///
/// Decodes the image, runs the classifier once for probabilities and
/// attention, fans the three saliency estimators out as parallel tasks,
/// reconciles their per-lead scores, and assembles the final report.
///
/// Synchronous and retry-free: failures are either fatal (shape mismatches,
/// classifier errors) or degenerate-but-handled (flat saliency maps, flagged
/// in the report). A caller-level timeout around this call is the intended
/// external control.
///
/// # Arguments
///
/// * `image_bytes` - Raw uploaded image (PNG or JPEG)
/// * `classifier` - Classifier collaborator
/// * `config` - Analysis configuration
///
/// # Returns
///
/// [`AnalysisReport`] with diagnosis, per-lead consensus scores, risk tier,
/// clinical interpretation, and saliency grids for renderers.
///
/// # Errors
///
/// Returns `AnalysisError` if the image cannot be decoded, the classifier
/// fails, or its outputs do not match the configured geometry.
pub fn analyze(
    image_bytes: &[u8],
    classifier: &dyn EcgClassifier,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    config.validate()?;
    let image = EcgImage::from_bytes(image_bytes, config.image_size)?;
    analyze_image(&image, classifier, config)
}

/// Analyze an already-decoded, normalized ECG image
///
/// Same pipeline as [`analyze`] minus the decoding step; useful when the
/// caller already holds the input tensor.
///
/// # Errors
///
/// Returns `AnalysisError` under the same conditions as [`analyze`].
pub fn analyze_image(
    image: &EcgImage,
    classifier: &dyn EcgClassifier,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    use std::time::Instant;
    let start_time = Instant::now();

    config.validate()?;

    if image.size() != config.image_size {
        return Err(AnalysisError::ShapeMismatch {
            expected: format!("{0}x{0} input image", config.image_size),
            got: format!("{0}x{0}", image.size()),
        });
    }

    let mapper = LeadMapper::new(config.image_size, config.image_size)?;

    log::debug!("Starting ECG analysis: {0}x{0} input", config.image_size);

    // One classifier pass supplies both the verdict and the attention tensor
    let (classification, attention_tensor) = classifier.predict_with_attention(image)?;

    log::debug!(
        "Classified as {} (confidence {:.3})",
        classification.diagnosis,
        classification.confidence
    );

    // Fan out the three estimators; each is pure over its inputs and none
    // reads another's output. Joined here before reconciliation.
    let (attention_result, (gradient_result, ablation_result)) = rayon::join(
        || rollout::attention_rollout(&attention_tensor, &mapper, config),
        || {
            rayon::join(
                || {
                    gradients::integrated_gradients(
                        image,
                        classification.diagnosis,
                        classifier,
                        &mapper,
                        config,
                    )
                },
                || ablation::ablation_impact(image, &classification, classifier, &mapper, config),
            )
        },
    );
    let attention_saliency = attention_result?;
    let gradient_saliency = gradient_result?;
    let ablation_impacts = ablation_result?;

    let consensus = consensus::reconcile(
        &attention_saliency,
        &gradient_saliency,
        &ablation_impacts,
        config,
    );

    let risk_level = analysis::risk::assess_risk(
        classification.diagnosis,
        classification.confidence,
        config,
    );
    let interpretation = analysis::interpretation::interpret(
        classification.diagnosis,
        classification.confidence,
        &consensus,
        config,
    );

    let processing_time = start_time.elapsed().as_secs_f32();

    log::debug!(
        "Analysis complete in {:.2}s: risk {:?}, consensus {:?}",
        processing_time,
        risk_level,
        consensus.level
    );

    Ok(AnalysisReport::assemble(
        &classification,
        &consensus,
        interpretation,
        risk_level,
        SaliencyGrids {
            attention: attention_saliency.grid,
            gradients: gradient_saliency.grid,
        },
        processing_time,
    ))
}
