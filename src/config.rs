//! Configuration parameters for ECG analysis
//!
//! Every threshold the engine applies is a named field here with a documented
//! default. Thresholds are fixed per deployment, never tuned per image.

/// Analysis configuration parameters
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    // Classifier geometry
    /// Input image side length in pixels (default: 224, ViT-Base/16)
    pub image_size: usize,

    /// Patch grid side length (default: 14; image_size / patch size)
    pub patch_grid: usize,

    /// Expected transformer layer count in the attention tensor (default: 12)
    pub attention_layers: usize,

    // Integrated gradients
    /// Interpolation steps for the baseline-to-input path (default: 50)
    ///
    /// More steps tighten the Riemann approximation of the path integral at
    /// the cost of one forward+backward pass each.
    pub gradient_steps: usize,

    // Ablation
    /// Fill value for masked lead regions, in normalized input space
    /// (default: 0.0, the all-zero baseline)
    pub ablation_fill: f32,

    // Consensus
    /// Top-K depth for per-method rankings when computing method agreement
    /// (default: 3)
    pub consensus_top_k: usize,

    /// Consensus score at or above which a lead is tiered `Critical`
    /// (default: 70.0)
    pub critical_score: f32,

    /// Consensus score at or above which a lead is tiered `Important`
    /// (default: 40.0)
    pub important_score: f32,

    // Risk assessment
    /// Confidence below which a Normal diagnosis escalates from low to
    /// moderate risk (default: 0.6)
    pub low_confidence: f32,

    /// Confidence above which an Abnormal diagnosis escalates from moderate
    /// to high risk (default: 0.8)
    pub high_certainty: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            image_size: 224,
            patch_grid: 14,
            attention_layers: 12,
            gradient_steps: 50,
            ablation_fill: 0.0,
            consensus_top_k: 3,
            critical_score: 70.0,
            important_score: 40.0,
            low_confidence: 0.6,
            high_certainty: 0.8,
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration consistency
    ///
    /// Called once at the start of every analysis so misconfiguration fails
    /// eagerly instead of surfacing as a mid-pipeline arithmetic error.
    pub fn validate(&self) -> Result<(), crate::error::AnalysisError> {
        use crate::error::AnalysisError;

        if self.image_size == 0 || self.patch_grid == 0 {
            return Err(AnalysisError::InvalidInput(
                "Image size and patch grid must be > 0".to_string(),
            ));
        }
        if self.patch_grid > self.image_size {
            return Err(AnalysisError::InvalidInput(format!(
                "Patch grid ({}) larger than image size ({})",
                self.patch_grid, self.image_size
            )));
        }
        if self.attention_layers == 0 {
            return Err(AnalysisError::InvalidInput(
                "Attention layer count must be > 0".to_string(),
            ));
        }
        if self.gradient_steps == 0 {
            return Err(AnalysisError::InvalidInput(
                "Gradient steps must be > 0".to_string(),
            ));
        }
        if self.consensus_top_k == 0 || self.consensus_top_k > crate::leads::Lead::COUNT {
            return Err(AnalysisError::InvalidInput(format!(
                "Consensus top-K must be in 1..={}, got {}",
                crate::leads::Lead::COUNT,
                self.consensus_top_k
            )));
        }
        if self.important_score > self.critical_score {
            return Err(AnalysisError::InvalidInput(format!(
                "Important tier threshold ({}) above critical threshold ({})",
                self.important_score, self.critical_score
            )));
        }
        if !(0.0..=1.0).contains(&self.low_confidence) || !(0.0..=1.0).contains(&self.high_certainty)
        {
            return Err(AnalysisError::InvalidInput(
                "Confidence thresholds must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_tier_thresholds_rejected() {
        let config = AnalysisConfig {
            critical_score: 40.0,
            important_score: 70.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_steps_rejected() {
        let config = AnalysisConfig {
            gradient_steps: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_top_k_bounds() {
        let config = AnalysisConfig {
            consensus_top_k: 13,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
