//! Analysis report types
//!
//! The aggregate the engine hands back to its caller (the upload/report
//! collaborator). Serialization order is deterministic: probability and
//! lead maps are `BTreeMap`s keyed by enums whose `Ord` is the canonical
//! order, so identical analyses serialize byte-identically.

use crate::classifier::{ClassificationResult, Diagnosis};
use crate::interpret::consensus::{Consensus, ConsensusLevel, ImportanceTier};
use crate::leads::{Lead, Territory};
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeMap;

use super::interpretation::{lead_finding, ClinicalInterpretation};
use super::risk::RiskLevel;

/// Reconciled scores and finding for one lead, as serialized in the report
#[derive(Debug, Clone, Serialize)]
pub struct LeadAssessment {
    /// Attention rollout score in [0, 100]
    pub attention_score: f32,

    /// Integrated gradients score in [0, 100]
    pub gradient_score: f32,

    /// Signed ablation impact in percentage points of confidence
    pub ablation_impact: f32,

    /// Blended consensus score in [0, 100]
    pub consensus_score: f32,

    /// Importance tier from the blended score
    pub consensus_level: ImportanceTier,

    /// Star rating (1-3; 0 is never assigned)
    pub consensus_stars: u8,

    /// Anatomical territory of the lead
    pub territory: Territory,

    /// Clinical finding for this lead under the current diagnosis
    pub primary_finding: String,
}

/// Analysis-wide interpretability verdict
#[derive(Debug, Clone, Serialize)]
pub struct InterpretabilitySummary {
    /// Agreement level between the three methods
    pub consensus_level: ConsensusLevel,

    /// Agreement score in [0, 100]
    pub consensus_score: f32,

    /// Leads every method independently ranks in its top-K
    pub common_leads: Vec<Lead>,

    /// Methods that produced no usable signal this analysis
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degenerate_methods: Vec<String>,
}

/// Pixel-level saliency grids for external heatmap renderers
///
/// One grid per pixel-level method, at input-image resolution, min-max
/// normalized to [0, 1]. Rendering (colormaps, overlays, file formats) is
/// the renderer's concern; the engine only supplies the numbers. Not part
/// of the serialized report.
#[derive(Debug, Clone)]
pub struct SaliencyGrids {
    /// Attention rollout saliency
    pub attention: Array2<f32>,

    /// Integrated gradients saliency
    pub gradients: Array2<f32>,
}

/// Engine provenance recorded with every report
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Engine version
    pub engine_version: String,

    /// Class labels in training order
    pub class_order: Vec<&'static str>,

    /// Interpretability methods that contributed
    pub methods_used: Vec<&'static str>,
}

/// Complete analysis report
///
/// Created once per uploaded scan and returned to the caller; the engine
/// retains nothing after returning.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Predicted class
    pub diagnosis: Diagnosis,

    /// Probability of the predicted class
    pub confidence: f32,

    /// Per-class probabilities
    pub probabilities: BTreeMap<Diagnosis, f32>,

    /// Per-lead scores and findings, keyed by lead
    pub lead_analysis: BTreeMap<Lead, LeadAssessment>,

    /// Analysis-wide interpretability verdict
    pub interpretability: InterpretabilitySummary,

    /// Patient-facing risk tier
    pub risk_level: RiskLevel,

    /// Clinician-readable interpretation
    pub interpretation: ClinicalInterpretation,

    /// Wall-clock processing time in seconds
    pub processing_time: f32,

    /// Engine provenance
    pub metadata: ReportMetadata,

    /// Saliency grids for renderers (not serialized)
    #[serde(skip_serializing)]
    pub saliency: SaliencyGrids,
}

impl AnalysisReport {
    /// Assemble the report from the pipeline outputs
    pub fn assemble(
        classification: &ClassificationResult,
        consensus: &Consensus,
        interpretation: ClinicalInterpretation,
        risk_level: RiskLevel,
        saliency: SaliencyGrids,
        processing_time: f32,
    ) -> Self {
        let lead_analysis: BTreeMap<Lead, LeadAssessment> = consensus
            .per_lead
            .iter()
            .map(|entry| {
                (
                    entry.lead,
                    LeadAssessment {
                        attention_score: entry.attention_score,
                        gradient_score: entry.gradient_score,
                        ablation_impact: entry.ablation_impact,
                        consensus_score: entry.consensus_score,
                        consensus_level: entry.tier,
                        consensus_stars: entry.stars,
                        territory: entry.lead.territory(),
                        primary_finding: lead_finding(classification.diagnosis, entry.tier)
                            .to_string(),
                    },
                )
            })
            .collect();

        Self {
            diagnosis: classification.diagnosis,
            confidence: classification.confidence,
            probabilities: classification.probabilities.clone(),
            lead_analysis,
            interpretability: InterpretabilitySummary {
                consensus_level: consensus.level,
                consensus_score: consensus.score,
                common_leads: consensus.common_leads.clone(),
                degenerate_methods: consensus
                    .degenerate_methods
                    .iter()
                    .map(|m| m.to_string())
                    .collect(),
            },
            risk_level,
            interpretation,
            processing_time,
            metadata: ReportMetadata {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                class_order: Diagnosis::CLASS_ORDER.iter().map(|d| d.label()).collect(),
                methods_used: vec![
                    crate::interpret::consensus::METHOD_ATTENTION,
                    crate::interpret::consensus::METHOD_GRADIENTS,
                    crate::interpret::consensus::METHOD_ABLATION,
                ],
            },
            saliency,
        }
    }
}
