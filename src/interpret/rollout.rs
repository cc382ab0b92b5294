//! Attention rollout saliency
//!
//! Flattens the transformer's per-layer self-attention into one end-to-end
//! map of how much the classification token attends to each image patch.
//!
//! # Algorithm
//!
//! Following Abnar & Zuidema (2020), the rollout starts from the identity
//! matrix over token positions and folds in one layer at a time:
//!
//! 1. Average the layer's attention matrices across heads
//! 2. Add the identity matrix to account for the residual connection
//! 3. Row-normalize so each token's outgoing attention sums to 1
//! 4. Left-multiply into the running rollout
//!
//! The classification-token row of the final matrix (minus its self-attention
//! term) is the patch saliency, reshaped onto the patch grid and upsampled to
//! image resolution for per-lead aggregation.
//!
//! # Reference
//!
//! Abnar, S., & Zuidema, W. (2020). Quantifying Attention Flow in
//! Transformers. *Proceedings of ACL 2020*.

use super::{normalize_grid, LeadScores, SaliencyOutput, EPSILON};
use crate::classifier::AttentionTensor;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::leads::LeadMapper;
use ndarray::{Array2, Axis};

/// Roll attention across all layers into per-lead saliency scores
///
/// # Arguments
///
/// * `tensor` - Per-layer attention weights from the classifier
/// * `mapper` - Lead partition at input-image resolution
/// * `config` - Expected classifier geometry
///
/// # Returns
///
/// [`SaliencyOutput`] with per-lead scores in [0, 100] and the image-
/// resolution saliency grid.
///
/// # Errors
///
/// Returns `AnalysisError::ShapeMismatch` if the tensor's layer count or
/// token count does not match the configured geometry. Fatal: the whole
/// analysis aborts rather than producing partial interpretability.
pub fn attention_rollout(
    tensor: &AttentionTensor,
    mapper: &LeadMapper,
    config: &AnalysisConfig,
) -> Result<SaliencyOutput, AnalysisError> {
    let tokens = config.patch_grid * config.patch_grid + 1;
    tensor.validate(config.attention_layers, tokens)?;

    log::debug!(
        "Rolling attention across {} layers, {} tokens",
        tensor.layers.len(),
        tokens
    );

    let identity = Array2::<f32>::eye(tokens);
    let mut rollout = identity.clone();

    for layer in &tensor.layers {
        // Average across heads, then fold in the residual path
        let mut averaged = layer.mean_axis(Axis(0)).ok_or_else(|| {
            AnalysisError::ShapeMismatch {
                expected: "at least one attention head".to_string(),
                got: "0 heads".to_string(),
            }
        })?;
        averaged += &identity;

        // Row-normalize so the matrix stays a transition matrix
        for mut row in averaged.rows_mut() {
            let sum: f32 = row.sum();
            if sum > EPSILON {
                row.mapv_inplace(|v| v / sum);
            }
        }

        rollout = averaged.dot(&rollout);
    }

    // CLS row, self-attention term discarded, reshaped onto the patch grid
    let cls_row = rollout.row(0);
    let grid_side = config.patch_grid;
    let mut patch_grid = Array2::<f32>::zeros((grid_side, grid_side));
    for (i, &value) in cls_row.iter().skip(1).enumerate() {
        patch_grid[[i / grid_side, i % grid_side]] = value;
    }

    let image_grid = upsample_nearest(&patch_grid, mapper.width(), mapper.height());

    // Per-lead mean over each lead's pixel cell
    let raw = LeadScores::from_fn(|lead| {
        let cell = mapper.cell(lead);
        let mut sum = 0.0;
        let mut count = 0usize;
        for y in cell.y0..cell.y1 {
            for x in cell.x0..cell.x1 {
                sum += image_grid[[y, x]];
                count += 1;
            }
        }
        sum / count as f32
    });

    let (scores, degenerate) = match raw.rescaled_0_100() {
        Some(scores) => (scores, false),
        None => {
            log::warn!("Attention rollout produced a flat map; marking method degenerate");
            (LeadScores::zeros(), true)
        }
    };

    Ok(SaliencyOutput {
        scores,
        degenerate,
        grid: normalize_grid(&image_grid),
    })
}

/// Nearest-neighbor upsample of a patch grid to image resolution
fn upsample_nearest(patch_grid: &Array2<f32>, width: usize, height: usize) -> Array2<f32> {
    let (rows, cols) = patch_grid.dim();
    let mut out = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        let py = (y * rows / height).min(rows - 1);
        for x in 0..width {
            let px = (x * cols / width).min(cols - 1);
            out[[y, x]] = patch_grid[[py, px]];
        }
    }
    out
}
