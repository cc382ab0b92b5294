//! Risk tier assignment
//!
//! Deterministic mapping from diagnosis and confidence to a patient-facing
//! risk tier. The thresholds live in [`AnalysisConfig`] as named constants;
//! nothing here is tuned per scan.

use crate::classifier::Diagnosis;
use crate::config::AnalysisConfig;
use serde::{Deserialize, Serialize};

/// Patient-facing risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Routine monitoring
    Low,
    /// Follow-up recommended
    Moderate,
    /// Urgent clinical attention
    High,
}

/// Assign the risk tier for a diagnosis at a given confidence
///
/// - Any MI-related diagnosis (active or historical) is high risk
///   regardless of confidence
/// - Abnormal is moderate, escalating to high when the model is highly
///   certain (confidence above `high_certainty`)
/// - Normal is low, escalating to moderate when the model is unsure
///   (confidence below `low_confidence`) — an uncertain "normal" should
///   not read as reassurance
pub fn assess_risk(diagnosis: Diagnosis, confidence: f32, config: &AnalysisConfig) -> RiskLevel {
    match diagnosis {
        Diagnosis::MiPatient | Diagnosis::MiHistory => RiskLevel::High,
        Diagnosis::Abnormal => {
            if confidence > config.high_certainty {
                RiskLevel::High
            } else {
                RiskLevel::Moderate
            }
        }
        Diagnosis::Normal => {
            if confidence < config.low_confidence {
                RiskLevel::Moderate
            } else {
                RiskLevel::Low
            }
        }
    }
}
