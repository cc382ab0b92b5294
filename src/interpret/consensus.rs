//! Consensus reconciliation across the three saliency methods
//!
//! Reconciles three heterogeneous signals — two bounded-positive-normalized
//! (attention rollout, integrated gradients) and one signed-unnormalized
//! (ablation impact) — into a single deterministic ranking and an agreement
//! verdict.
//!
//! Method agreement (`common_leads`) is computed from the three *raw*
//! per-method rankings before any blending: a lead counts as agreed only if
//! every method, taken on its own, ranks it in its top-K. This is the
//! strongest test of agreement and is deliberately not derived from the
//! blended score.

use super::{LeadScores, SaliencyOutput, EPSILON};
use crate::config::AnalysisConfig;
use crate::leads::Lead;
use serde::{Deserialize, Serialize};

/// Method label for the attention rollout estimator
pub const METHOD_ATTENTION: &str = "attention_rollout";

/// Method label for the integrated gradients estimator
pub const METHOD_GRADIENTS: &str = "integrated_gradients";

/// Method label for the ablation impact estimator
pub const METHOD_ABLATION: &str = "ablation_impact";

/// Per-lead importance tier derived from the blended consensus score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceTier {
    /// Blended score at or above the critical threshold
    Critical,
    /// Blended score at or above the important threshold
    Important,
    /// Everything else
    Minor,
}

/// Analysis-wide agreement level between the three methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsensusLevel {
    /// At least two of the top-K leads are agreed by all three methods
    High,
    /// Exactly one top-K lead is agreed by all three methods
    Moderate,
    /// No lead is agreed by all three methods
    Low,
}

/// Reconciled scores for one lead
#[derive(Debug, Clone, PartialEq)]
pub struct LeadConsensus {
    /// The lead
    pub lead: Lead,
    /// Attention rollout score in [0, 100] (0 if the method was degenerate)
    pub attention_score: f32,
    /// Integrated gradients score in [0, 100] (0 if the method was degenerate)
    pub gradient_score: f32,
    /// Signed ablation impact in percentage points, [-100, 100]
    pub ablation_impact: f32,
    /// Blended consensus score in [0, 100]
    pub consensus_score: f32,
    /// Importance tier from the blended score
    pub tier: ImportanceTier,
    /// Star rating: Critical = 3, Important = 2, Minor = 1 (0 is never used)
    pub stars: u8,
}

/// Full reconciliation output
#[derive(Debug, Clone)]
pub struct Consensus {
    /// One entry per lead, ordered by consensus score descending with
    /// canonical lead order as the tie-break
    pub per_lead: Vec<LeadConsensus>,
    /// Analysis-wide agreement level
    pub level: ConsensusLevel,
    /// Analysis-wide agreement score in [0, 100]: agreed leads over top-K
    pub score: f32,
    /// Leads every method independently ranks in its top-K, canonical order
    pub common_leads: Vec<Lead>,
    /// Methods that produced a flat/empty map and were excluded from
    /// blending via weight redistribution
    pub degenerate_methods: Vec<&'static str>,
}

/// Per-lead blend weights for the three methods, in method order
/// (attention, gradients, ablation)
///
/// Equal thirds when all methods contribute; a method with no nonzero output
/// for the lead is dropped and its weight redistributed proportionally among
/// the remaining methods. The weights always sum to 1 — when no method
/// contributes, equal thirds are kept (the blended score is zero anyway).
pub fn blend_weights(present: [bool; 3]) -> [f32; 3] {
    let count = present.iter().filter(|&&p| p).count();
    if count == 0 {
        return [1.0 / 3.0; 3];
    }
    let share = 1.0 / count as f32;
    [
        if present[0] { share } else { 0.0 },
        if present[1] { share } else { 0.0 },
        if present[2] { share } else { 0.0 },
    ]
}

/// Reconcile the three method outputs into one consensus
///
/// Deterministic: no randomness, no history, no hashmap iteration. The same
/// inputs always produce byte-identical output.
///
/// # Arguments
///
/// * `attention` - Attention rollout output
/// * `gradients` - Integrated gradients output
/// * `ablation` - Signed ablation impacts (raw percentage points)
/// * `config` - Tier thresholds and top-K depth
pub fn reconcile(
    attention: &SaliencyOutput,
    gradients: &SaliencyOutput,
    ablation: &LeadScores,
    config: &AnalysisConfig,
) -> Consensus {
    let top_k = config.consensus_top_k;

    // Ablation joins the comparison on magnitude: |impact| rescaled with
    // the same per-analysis min-max rule as the other two methods
    let ablation_abs = ablation.abs();
    let (ablation_normalized, ablation_degenerate) = match ablation_abs.rescaled_0_100() {
        Some(scores) => (scores, false),
        None => {
            log::warn!("Ablation impacts are flat; marking method degenerate");
            (LeadScores::zeros(), true)
        }
    };

    let mut degenerate_methods = Vec::new();
    if attention.degenerate {
        degenerate_methods.push(METHOD_ATTENTION);
    }
    if gradients.degenerate {
        degenerate_methods.push(METHOD_GRADIENTS);
    }
    if ablation_degenerate {
        degenerate_methods.push(METHOD_ABLATION);
    }

    // Method agreement from raw per-method rankings, before blending.
    // A degenerate method has no meaningful ranking and therefore agrees on
    // nothing.
    let attention_top = if attention.degenerate {
        Vec::new()
    } else {
        attention.scores.top_k(top_k)
    };
    let gradient_top = if gradients.degenerate {
        Vec::new()
    } else {
        gradients.scores.top_k(top_k)
    };
    let ablation_top = if ablation_degenerate {
        Vec::new()
    } else {
        ablation_abs.top_k(top_k)
    };

    let common_leads: Vec<Lead> = Lead::ALL
        .iter()
        .copied()
        .filter(|lead| {
            attention_top.contains(lead)
                && gradient_top.contains(lead)
                && ablation_top.contains(lead)
        })
        .collect();

    // Blend per lead with presence-aware weight redistribution
    let mut per_lead: Vec<LeadConsensus> = Lead::ALL
        .iter()
        .map(|&lead| {
            let a = attention.scores.get(lead);
            let g = gradients.scores.get(lead);
            let b = ablation_normalized.get(lead);

            let present = [a > EPSILON, g > EPSILON, b > EPSILON];
            let weights = blend_weights(present);
            let consensus_score = a * weights[0] + g * weights[1] + b * weights[2];

            let (tier, stars) = if consensus_score >= config.critical_score {
                (ImportanceTier::Critical, 3)
            } else if consensus_score >= config.important_score {
                (ImportanceTier::Important, 2)
            } else {
                (ImportanceTier::Minor, 1)
            };

            LeadConsensus {
                lead,
                attention_score: a,
                gradient_score: g,
                ablation_impact: ablation.get(lead),
                consensus_score,
                tier,
                stars,
            }
        })
        .collect();

    per_lead.sort_by(|x, y| {
        y.consensus_score
            .partial_cmp(&x.consensus_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(x.lead.index().cmp(&y.lead.index()))
    });

    let level = match common_leads.len() {
        0 => ConsensusLevel::Low,
        1 => ConsensusLevel::Moderate,
        _ => ConsensusLevel::High,
    };
    let score = common_leads.len().min(top_k) as f32 / top_k as f32 * 100.0;

    log::debug!(
        "Consensus: level {:?}, score {:.0}, common leads [{}], degenerate [{}]",
        level,
        score,
        common_leads
            .iter()
            .map(|l| l.name())
            .collect::<Vec<_>>()
            .join(", "),
        degenerate_methods.join(", ")
    );

    Consensus {
        per_lead,
        level,
        score,
        common_leads,
        degenerate_methods,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn output(scores: LeadScores) -> SaliencyOutput {
        let degenerate = scores.is_degenerate();
        SaliencyOutput {
            scores,
            degenerate,
            grid: Array2::zeros((4, 4)),
        }
    }

    fn scores_with(pairs: &[(Lead, f32)]) -> LeadScores {
        let mut scores = LeadScores::zeros();
        for &(lead, v) in pairs {
            scores.set(lead, v);
        }
        scores
    }

    #[test]
    fn test_blend_weights_sum_to_one() {
        for mask in 0u8..8 {
            let present = [mask & 1 != 0, mask & 2 != 0, mask & 4 != 0];
            let weights = blend_weights(present);
            let sum: f32 = weights.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-6,
                "weights {:?} for presence {:?} sum to {}",
                weights,
                present,
                sum
            );
        }
    }

    #[test]
    fn test_blend_weights_redistribution() {
        assert_eq!(blend_weights([true, true, true]), [1.0 / 3.0; 3]);
        assert_eq!(blend_weights([true, false, true]), [0.5, 0.0, 0.5]);
        assert_eq!(blend_weights([false, false, true]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_all_methods_agree_on_v2() {
        let attention = output(scores_with(&[(Lead::V2, 100.0), (Lead::V1, 60.0), (Lead::V3, 40.0)]));
        let gradients = output(scores_with(&[(Lead::V2, 100.0), (Lead::I, 55.0), (Lead::V3, 30.0)]));
        let ablation = scores_with(&[(Lead::V2, 42.0), (Lead::AVF, 10.0), (Lead::V3, 8.0)]);
        let config = AnalysisConfig::default();

        let consensus = reconcile(&attention, &gradients, &ablation, &config);

        assert!(consensus.common_leads.contains(&Lead::V2));
        assert!(consensus.common_leads.contains(&Lead::V3));
        assert_eq!(consensus.level, ConsensusLevel::High);
        assert_eq!(consensus.per_lead[0].lead, Lead::V2);
        assert_eq!(consensus.per_lead[0].stars, 3);
        assert_eq!(consensus.per_lead.len(), Lead::COUNT);
    }

    /// Every lead gets `base`, then the listed overrides
    fn scores_with_base(base: f32, pairs: &[(Lead, f32)]) -> LeadScores {
        let mut scores = LeadScores::from_fn(|_| base);
        for &(lead, v) in pairs {
            scores.set(lead, v);
        }
        scores
    }

    #[test]
    fn test_common_leads_use_raw_rankings_not_blended() {
        // V4 is top-3 in the *blended* score (strong in two methods) but
        // missing from ablation's raw top-3 entirely. The agreement set must
        // reflect the raw rankings: only V2 is in all three top-3 lists.
        let attention = output(scores_with_base(
            5.0,
            &[(Lead::V2, 100.0), (Lead::V4, 95.0), (Lead::V5, 90.0)],
        ));
        let gradients = output(scores_with_base(
            5.0,
            &[(Lead::V2, 100.0), (Lead::V4, 98.0), (Lead::V6, 60.0)],
        ));
        let ablation = scores_with_base(
            0.5,
            &[
                (Lead::V2, 50.0),
                (Lead::I, 40.0),
                (Lead::II, 30.0),
                (Lead::V4, 1.0),
            ],
        );
        let config = AnalysisConfig::default();

        let consensus = reconcile(&attention, &gradients, &ablation, &config);

        // Blended ranking puts V4 near the top...
        assert!(consensus.per_lead[..3]
            .iter()
            .any(|entry| entry.lead == Lead::V4));
        // ...but agreement is V2 alone
        assert_eq!(consensus.common_leads, vec![Lead::V2]);
        assert_eq!(consensus.level, ConsensusLevel::Moderate);
    }

    #[test]
    fn test_degenerate_method_is_flagged_not_fatal() {
        // Flat attention: no division error, flag set, scores still bounded
        let attention = output(LeadScores::zeros());
        let gradients = output(scores_with(&[(Lead::V1, 100.0), (Lead::V2, 80.0)]));
        let ablation = scores_with(&[(Lead::V1, 20.0), (Lead::V3, 5.0)]);
        let config = AnalysisConfig::default();

        let consensus = reconcile(&attention, &gradients, &ablation, &config);

        assert_eq!(consensus.degenerate_methods, vec![METHOD_ATTENTION]);
        // Agreement requires all three methods; a degenerate method agrees
        // on nothing
        assert!(consensus.common_leads.is_empty());
        assert_eq!(consensus.level, ConsensusLevel::Low);
        for entry in &consensus.per_lead {
            assert!((0.0..=100.0).contains(&entry.consensus_score));
        }
    }

    #[test]
    fn test_all_methods_degenerate() {
        let attention = output(LeadScores::zeros());
        let gradients = output(LeadScores::zeros());
        let ablation = LeadScores::zeros();
        let config = AnalysisConfig::default();

        let consensus = reconcile(&attention, &gradients, &ablation, &config);

        assert_eq!(
            consensus.degenerate_methods,
            vec![METHOD_ATTENTION, METHOD_GRADIENTS, METHOD_ABLATION]
        );
        assert_eq!(consensus.level, ConsensusLevel::Low);
        assert_eq!(consensus.score, 0.0);
        for entry in &consensus.per_lead {
            assert_eq!(entry.consensus_score, 0.0);
            assert_eq!(entry.stars, 1);
        }
    }

    #[test]
    fn test_tier_thresholds() {
        let attention = output(scores_with(&[
            (Lead::V1, 100.0),
            (Lead::V2, 50.0),
            (Lead::V3, 10.0),
        ]));
        let gradients = output(scores_with(&[
            (Lead::V1, 100.0),
            (Lead::V2, 50.0),
            (Lead::V3, 10.0),
        ]));
        let ablation = scores_with(&[(Lead::V1, 30.0), (Lead::V2, 15.0), (Lead::V3, 3.0)]);
        let config = AnalysisConfig::default();

        let consensus = reconcile(&attention, &gradients, &ablation, &config);

        let entry = |lead: Lead| {
            consensus
                .per_lead
                .iter()
                .find(|e| e.lead == lead)
                .unwrap()
                .clone()
        };

        // V1: all methods at 100 -> critical, 3 stars
        assert_eq!(entry(Lead::V1).tier, ImportanceTier::Critical);
        assert_eq!(entry(Lead::V1).stars, 3);
        // V2: all methods at 50 -> important, 2 stars
        assert_eq!(entry(Lead::V2).tier, ImportanceTier::Important);
        assert_eq!(entry(Lead::V2).stars, 2);
        // V3: all methods at 10 -> minor, 1 star (never 0)
        assert_eq!(entry(Lead::V3).tier, ImportanceTier::Minor);
        assert_eq!(entry(Lead::V3).stars, 1);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let attention = output(scores_with(&[(Lead::V2, 100.0), (Lead::II, 70.0)]));
        let gradients = output(scores_with(&[(Lead::V2, 90.0), (Lead::III, 80.0)]));
        let ablation = scores_with(&[(Lead::V2, 25.0), (Lead::II, -12.0)]);
        let config = AnalysisConfig::default();

        let a = reconcile(&attention, &gradients, &ablation, &config);
        let b = reconcile(&attention, &gradients, &ablation, &config);

        assert_eq!(a.per_lead, b.per_lead);
        assert_eq!(a.common_leads, b.common_leads);
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn test_signed_impact_survives_into_output() {
        let attention = output(scores_with(&[(Lead::V2, 100.0)]));
        let gradients = output(scores_with(&[(Lead::V2, 100.0)]));
        let ablation = scores_with(&[(Lead::V2, 30.0), (Lead::AVR, -8.0)]);
        let config = AnalysisConfig::default();

        let consensus = reconcile(&attention, &gradients, &ablation, &config);

        let avr = consensus
            .per_lead
            .iter()
            .find(|e| e.lead == Lead::AVR)
            .unwrap();
        // Blending uses |impact| but the report keeps the sign
        assert_eq!(avr.ablation_impact, -8.0);
    }
}
