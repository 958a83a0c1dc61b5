//! Confidence grid to alpha mask conversion

use crate::{
    error::Result,
    types::{Channels, ConfidenceGrid, RasterImage},
    utils::NumericValidator,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Mask sample at or above which a pixel counts as foreground in statistics
const FOREGROUND_LEVEL: f32 = 0.5;

/// Normalize a confidence grid into a single-channel mask
///
/// Every value `v` becomes `clamp((v - low) / (high - low), 0, 1)`. The mask
/// has exactly the grid's dimensions; no resampling happens here.
///
/// # Errors
/// - `InvalidRange` when `high <= low` (this includes `high == low`) or a
///   bound is not finite
pub fn build_mask(grid: &ConfidenceGrid, low: f32, high: f32) -> Result<RasterImage> {
    MaskBuilder::new(low, high)?.build(grid)
}

/// Reusable normalization range for turning model output into masks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskBuilder {
    low: f32,
    high: f32,
}

impl MaskBuilder {
    /// Create a builder for the interval `[low, high]`
    pub fn new(low: f32, high: f32) -> Result<Self> {
        let (low, high) = NumericValidator::validate_interval(low, high)?;
        Ok(Self { low, high })
    }

    /// Use the grid's own observed range
    ///
    /// A flat grid has no usable range, so it falls back to `[0, 1]`.
    #[must_use]
    pub fn from_grid_range(grid: &ConfidenceGrid) -> Self {
        let (low, high) = grid.value_range();
        if high > low {
            Self { low, high }
        } else {
            Self::default()
        }
    }

    #[must_use]
    pub fn low(&self) -> f32 {
        self.low
    }

    #[must_use]
    pub fn high(&self) -> f32 {
        self.high
    }

    /// Normalize `grid` into a mask raster
    #[instrument(level = "debug", skip(self, grid), fields(width = grid.width(), height = grid.height()))]
    pub fn build(&self, grid: &ConfidenceGrid) -> Result<RasterImage> {
        let span = self.high - self.low;
        let data: Vec<f32> = grid
            .values()
            .iter()
            .map(|&v| ((v - self.low) / span).clamp(0.0, 1.0))
            .collect();

        debug!(low = self.low, high = self.high, "built mask from confidence grid");
        RasterImage::new(grid.width(), grid.height(), Channels::Luma, data)
    }
}

impl Default for MaskBuilder {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 1.0,
        }
    }
}

/// Statistics about a mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Count foreground and background pixels of a mask at the 0.5 level
///
/// Multi-channel images are reduced to luminance first.
#[must_use]
pub fn mask_statistics(mask: &RasterImage) -> MaskStatistics {
    let luma = mask.to_luma();
    let total_pixels = luma.area();
    let foreground_pixels = luma
        .data()
        .iter()
        .filter(|&&v| v >= FOREGROUND_LEVEL)
        .count();
    let background_pixels = total_pixels - foreground_pixels;

    let (foreground_ratio, background_ratio) = if total_pixels == 0 {
        (0.0, 0.0)
    } else {
        (
            foreground_pixels as f32 / total_pixels as f32,
            background_pixels as f32 / total_pixels as f32,
        )
    };

    MaskStatistics {
        total_pixels,
        foreground_pixels,
        background_pixels,
        foreground_ratio,
        background_ratio,
    }
}
