//! Error types for the ECG interpretability engine

use std::fmt;

/// Errors that can occur during ECG analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input parameters
    InvalidInput(String),

    /// Classifier output does not match the expected tensor geometry.
    ///
    /// Fatal: the analysis is aborted and no partial interpretability
    /// result is produced.
    ShapeMismatch {
        /// Expected geometry (layers, tokens, classes, ...)
        expected: String,
        /// Geometry actually observed
        got: String,
    },

    /// Pixel coordinates fall outside the configured image bounds.
    ///
    /// Indicates a misconfigured lead partition table; caught eagerly at
    /// mapper construction, never at request time.
    InvalidCoordinate {
        /// X coordinate
        x: usize,
        /// Y coordinate
        y: usize,
        /// Image width the mapper was built for
        width: usize,
        /// Image height the mapper was built for
        height: usize,
    },

    /// The external classifier collaborator failed or is unreachable.
    ///
    /// Propagated upward without retry; retry/backoff policy belongs to the
    /// caller.
    ClassifierUnavailable(String),

    /// Processing error during analysis
    ProcessingError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::ShapeMismatch { expected, got } => {
                write!(f, "Shape mismatch: expected {}, got {}", expected, got)
            }
            AnalysisError::InvalidCoordinate {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "Coordinate ({}, {}) outside image bounds {}x{}",
                x, y, width, height
            ),
            AnalysisError::ClassifierUnavailable(msg) => {
                write!(f, "Classifier unavailable: {}", msg)
            }
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shape_mismatch() {
        let err = AnalysisError::ShapeMismatch {
            expected: "12 layers".to_string(),
            got: "6 layers".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Shape mismatch: expected 12 layers, got 6 layers"
        );
    }

    #[test]
    fn test_display_invalid_coordinate() {
        let err = AnalysisError::InvalidCoordinate {
            x: 300,
            y: 10,
            width: 224,
            height: 224,
        };
        assert_eq!(
            err.to_string(),
            "Coordinate (300, 10) outside image bounds 224x224"
        );
    }
}
