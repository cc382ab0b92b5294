//! Ablation impact saliency
//!
//! Measures how much each lead supports the diagnosis by masking the lead
//! out and re-running the classifier: one forward pass per lead, each on its
//! own masked copy of the input.
//!
//! Unlike the other two methods the result is *signed*: a positive impact
//! means removing the lead lowered the model's confidence (the lead was
//! supportive), a negative impact means removing it raised confidence.
//! The percentage-point scale is already bounded by [-100, 100], so no
//! further normalization is applied here; the consensus reconciler rescales
//! `|impact|` when it needs a comparable magnitude.

use super::LeadScores;
use crate::classifier::{ClassificationResult, EcgClassifier};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::leads::{Lead, LeadMapper};
use crate::preprocessing::EcgImage;

/// Measure per-lead confidence deltas under masking
///
/// This is the only estimator whose cost scales with the lead count:
/// O(N) forward passes for N leads. The input image is never mutated; each
/// ablation works on a fresh copy.
///
/// # Arguments
///
/// * `image` - Normalized input image
/// * `classification` - The unablated prediction (supplies the reference
///   confidence and the class whose probability is tracked)
/// * `classifier` - Collaborator providing forward passes
/// * `mapper` - Lead partition at input-image resolution
/// * `config` - Neutral fill value
///
/// # Returns
///
/// Signed per-lead impacts in percentage points of confidence.
///
/// # Errors
///
/// Propagates classifier failures unchanged; a failed forward pass aborts
/// the analysis (no retries).
pub fn ablation_impact(
    image: &EcgImage,
    classification: &ClassificationResult,
    classifier: &dyn EcgClassifier,
    mapper: &LeadMapper,
    config: &AnalysisConfig,
) -> Result<LeadScores, AnalysisError> {
    let target = classification.diagnosis;
    let original_confidence = classification.confidence;

    log::debug!(
        "Ablating {} leads against {} (confidence {:.3})",
        Lead::COUNT,
        target,
        original_confidence
    );

    let mut impacts = LeadScores::zeros();

    for lead in Lead::ALL {
        let masked = image.masked(mapper.cell(lead), config.ablation_fill);
        let ablated = classifier.predict(&masked)?;
        let ablated_confidence = ablated
            .probabilities
            .get(&target)
            .copied()
            .unwrap_or(0.0);

        let impact = (original_confidence - ablated_confidence) * 100.0;
        impacts.set(lead, impact);

        log::debug!(
            "Ablation {}: confidence {:.3} -> {:.3} (impact {:+.1} pp)",
            lead,
            original_confidence,
            ablated_confidence,
            impact
        );
    }

    Ok(impacts)
}
