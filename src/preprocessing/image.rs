//! ECG image decoding and normalization
//!
//! The classifier expects a `(3, size, size)` tensor normalized to
//! `(x / 255 - 0.5) / 0.5`, i.e. values in `[-1, 1]` — the preprocessing the
//! ViT image processor applies. Decoding and resizing happen once per
//! analysis; the estimators only ever read the result or derive copies.

use crate::error::AnalysisError;
use crate::leads::LeadCell;
use image::imageops::FilterType;
use ndarray::Array3;

/// Per-channel normalization mean (ViT image processor default)
const NORM_MEAN: f32 = 0.5;

/// Per-channel normalization standard deviation (ViT image processor default)
const NORM_STD: f32 = 0.5;

/// Decoded, resized, normalized ECG image
///
/// Layout is `(channel, row, column)`. Immutable once built; the ablation
/// estimator derives per-lead masked copies rather than mutating in place.
#[derive(Debug, Clone)]
pub struct EcgImage {
    data: Array3<f32>,
}

impl EcgImage {
    /// Decode raw upload bytes into a normalized input tensor
    ///
    /// Accepts any format the `image` crate can probe (PNG and JPEG in this
    /// build), converts to RGB, and resizes to `size` x `size` with a
    /// triangle filter.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the bytes cannot be decoded.
    pub fn from_bytes(bytes: &[u8], size: usize) -> Result<Self, AnalysisError> {
        if bytes.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Empty image bytes".to_string(),
            ));
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| AnalysisError::InvalidInput(format!("Image decode failed: {}", e)))?;

        log::debug!(
            "Decoded scan image {}x{}, resizing to {}x{}",
            decoded.width(),
            decoded.height(),
            size,
            size
        );

        let resized = decoded
            .resize_exact(size as u32, size as u32, FilterType::Triangle)
            .to_rgb8();

        let mut data = Array3::<f32>::zeros((3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                data[[c, y as usize, x as usize]] = (value - NORM_MEAN) / NORM_STD;
            }
        }

        Ok(Self { data })
    }

    /// Wrap an already-normalized `(3, h, w)` tensor
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ShapeMismatch` if the tensor is not
    /// three-channel or not square.
    pub fn from_tensor(data: Array3<f32>) -> Result<Self, AnalysisError> {
        let (c, h, w) = data.dim();
        if c != 3 || h != w {
            return Err(AnalysisError::ShapeMismatch {
                expected: "(3, n, n) tensor".to_string(),
                got: format!("({}, {}, {})", c, h, w),
            });
        }
        Ok(Self { data })
    }

    /// Normalized pixel tensor, `(channel, row, column)`
    pub fn tensor(&self) -> &Array3<f32> {
        &self.data
    }

    /// Image side length in pixels
    pub fn size(&self) -> usize {
        self.data.dim().1
    }

    /// Copy with one lead cell replaced by a uniform fill value
    ///
    /// The original buffer is never touched; each ablation pass works on its
    /// own copy.
    pub fn masked(&self, cell: LeadCell, fill: f32) -> EcgImage {
        let mut data = self.data.clone();
        for c in 0..3 {
            for y in cell.y0..cell.y1 {
                for x in cell.x0..cell.x1 {
                    data[[c, y, x]] = fill;
                }
            }
        }
        EcgImage { data }
    }

    /// Point on the straight-line path from the all-zero baseline to this
    /// image: `baseline + alpha * (self - baseline)` with a zero baseline
    pub fn scaled(&self, alpha: f32) -> EcgImage {
        EcgImage {
            data: &self.data * alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leads::LeadMapper;

    fn uniform_image(size: usize, value: f32) -> EcgImage {
        EcgImage::from_tensor(Array3::from_elem((3, size, size), value)).unwrap()
    }

    #[test]
    fn test_from_tensor_validates_shape() {
        assert!(EcgImage::from_tensor(Array3::zeros((3, 8, 8))).is_ok());
        assert!(EcgImage::from_tensor(Array3::zeros((1, 8, 8))).is_err());
        assert!(EcgImage::from_tensor(Array3::zeros((3, 8, 4))).is_err());
    }

    #[test]
    fn test_empty_bytes_rejected() {
        assert!(matches!(
            EcgImage::from_bytes(&[], 224),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_masked_fills_only_the_cell() {
        let image = uniform_image(12, 1.0);
        let mapper = LeadMapper::new(12, 12).unwrap();
        let cell = mapper.cell(crate::leads::Lead::V2);

        let masked = image.masked(cell, 0.0);

        // Inside the cell: filled
        assert_eq!(masked.tensor()[[0, cell.y0, cell.x0]], 0.0);
        // Outside the cell: untouched
        assert_eq!(masked.tensor()[[0, 0, 0]], 1.0);
        // Original untouched
        assert_eq!(image.tensor()[[0, cell.y0, cell.x0]], 1.0);
    }

    #[test]
    fn test_scaled_is_linear_from_zero() {
        let image = uniform_image(8, 0.8);
        let half = image.scaled(0.5);
        assert!((half.tensor()[[0, 0, 0]] - 0.4).abs() < 1e-6);
        assert_eq!(image.scaled(0.0).tensor()[[2, 7, 7]], 0.0);
    }
}
