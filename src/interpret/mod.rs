//! Interpretability estimators and consensus reconciliation
//!
//! Three structurally different saliency methods, each a pure function from
//! the analysis inputs to an immutable per-lead score map:
//! - Attention rollout (transformer attention flattened across layers)
//! - Integrated gradients (path-integrated input attribution)
//! - Ablation impact (confidence delta under per-lead masking)
//!
//! No method reads another's output; the [`consensus`] reconciler joins them
//! after all three complete.

pub mod ablation;
pub mod consensus;
pub mod gradients;
pub mod rollout;

use crate::leads::Lead;
use ndarray::Array2;

/// Numerical stability epsilon
pub(crate) const EPSILON: f32 = 1e-10;

/// Dense per-lead score table in canonical lead order
///
/// Fixed-size and index-addressed so iteration order, ranking tie-breaks,
/// and serialization are deterministic — no hashmap iteration anywhere in
/// the scoring path.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadScores {
    values: [f32; Lead::COUNT],
}

impl LeadScores {
    /// All-zero score table
    pub fn zeros() -> Self {
        Self {
            values: [0.0; Lead::COUNT],
        }
    }

    /// Build from a closure over leads
    pub fn from_fn(mut f: impl FnMut(Lead) -> f32) -> Self {
        let mut values = [0.0; Lead::COUNT];
        for lead in Lead::ALL {
            values[lead.index()] = f(lead);
        }
        Self { values }
    }

    /// Score for one lead
    pub fn get(&self, lead: Lead) -> f32 {
        self.values[lead.index()]
    }

    /// Set the score for one lead
    pub fn set(&mut self, lead: Lead, value: f32) {
        self.values[lead.index()] = value;
    }

    /// Iterate `(lead, score)` in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Lead, f32)> + '_ {
        Lead::ALL.iter().map(move |&lead| (lead, self.get(lead)))
    }

    /// Maximum score
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Minimum score
    pub fn min(&self) -> f32 {
        self.values.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// True if the map carries no usable signal (flat or all-zero)
    ///
    /// A fully uniform map ranks every lead equally; downstream treats such
    /// a method as degenerate rather than dividing by a zero range.
    pub fn is_degenerate(&self) -> bool {
        (self.max() - self.min()).abs() <= EPSILON
    }

    /// Min-max rescale onto [0, 100] within this analysis
    ///
    /// The maximum lead maps to 100 and the minimum to 0. Absolute
    /// magnitudes are not comparable between scans, so normalization is
    /// always per-analysis. Returns `None` for a degenerate map.
    pub fn rescaled_0_100(&self) -> Option<LeadScores> {
        let min = self.min();
        let range = self.max() - min;
        if range.abs() <= EPSILON {
            return None;
        }
        Some(LeadScores::from_fn(|lead| {
            (self.get(lead) - min) / range * 100.0
        }))
    }

    /// Element-wise absolute value
    pub fn abs(&self) -> LeadScores {
        LeadScores::from_fn(|lead| self.get(lead).abs())
    }

    /// Top-K leads ranked by score descending
    ///
    /// Only leads with nonzero signal rank; a lead absent from the method's
    /// nonzero output never enters its top-K. Ties resolve to canonical lead
    /// order, so the ranking is a total order and repeated runs return
    /// identical lists.
    pub fn top_k(&self, k: usize) -> Vec<Lead> {
        let mut ranked: Vec<Lead> = Lead::ALL
            .iter()
            .copied()
            .filter(|&lead| self.get(lead) > EPSILON)
            .collect();
        ranked.sort_by(|a, b| {
            self.get(*b)
                .partial_cmp(&self.get(*a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index().cmp(&b.index()))
        });
        ranked.truncate(k);
        ranked
    }
}

/// Output of one pixel-level saliency method
#[derive(Debug, Clone)]
pub struct SaliencyOutput {
    /// Per-lead scores rescaled to [0, 100]; all-zero when degenerate
    pub scores: LeadScores,

    /// True if the method produced a flat map and the scores are a
    /// placeholder rather than a real ranking
    pub degenerate: bool,

    /// Pixel-level saliency at input-image resolution, min-max normalized
    /// to [0, 1], for external heatmap renderers
    pub grid: Array2<f32>,
}

/// Min-max normalize a 2D grid onto [0, 1]; zeros if flat
pub(crate) fn normalize_grid(grid: &Array2<f32>) -> Array2<f32> {
    let min = grid.iter().copied().fold(f32::INFINITY, f32::min);
    let max = grid.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range.abs() <= EPSILON {
        return Array2::zeros(grid.raw_dim());
    }
    grid.mapv(|v| (v - min) / range)
}
