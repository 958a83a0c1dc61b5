//! Precomputed mask backend
//!
//! Stands in for a segmentation model when the mask already exists, for
//! example one exported by an external matting tool. The mask's luminance is
//! used as confidence, so white marks the subject.

use crate::config::ProcessorConfig;
use crate::error::{BgEraseError, Result};
use crate::inference::SegmentationBackend;
use crate::types::{ConfidenceGrid, RasterImage};
use std::path::PathBuf;

// Use instant crate for cross-platform time compatibility
use instant::{Duration, Instant};

#[derive(Debug, Clone)]
enum MaskSource {
    File(PathBuf),
    Raster(RasterImage),
}

/// Backend that returns the same precomputed mask for every image
#[derive(Debug, Clone)]
pub struct MaskImageBackend {
    source: MaskSource,
    grid: Option<ConfidenceGrid>,
}

impl MaskImageBackend {
    /// Load the mask from `path` during initialization
    #[must_use]
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            source: MaskSource::File(path.into()),
            grid: None,
        }
    }

    /// Use an already decoded mask
    #[must_use]
    pub fn from_raster(mask: RasterImage) -> Self {
        Self {
            source: MaskSource::Raster(mask),
            grid: None,
        }
    }

    fn load_grid(&self) -> Result<ConfidenceGrid> {
        let raster = match &self.source {
            MaskSource::File(path) => {
                log::debug!("Loading precomputed mask from {}", path.display());
                let decoded =
                    image::open(path).map_err(|e| BgEraseError::image_load_error(path, e))?;
                RasterImage::from_dynamic(&decoded)
            },
            MaskSource::Raster(raster) => raster.clone(),
        };

        let luma = raster.to_luma();
        ConfidenceGrid::from_vec(luma.width(), luma.height(), luma.into_data())
    }
}

impl SegmentationBackend for MaskImageBackend {
    fn initialize(&mut self, _config: &ProcessorConfig) -> Result<Option<Duration>> {
        if self.grid.is_some() {
            return Ok(None);
        }

        let load_start = Instant::now();
        let grid = self.load_grid()?;
        log::info!(
            "Mask backend ready with {}x{} mask",
            grid.width(),
            grid.height()
        );
        self.grid = Some(grid);

        Ok(Some(load_start.elapsed()))
    }

    fn infer(&mut self, image: &RasterImage) -> Result<ConfidenceGrid> {
        let grid = self
            .grid
            .as_ref()
            .ok_or_else(|| BgEraseError::inference("Mask backend not initialized"))?;

        if grid.dimensions() != image.dimensions() {
            log::debug!(
                "Mask is {}x{}, image is {}x{}; it will be resampled",
                grid.width(),
                grid.height(),
                image.width(),
                image.height()
            );
        }

        Ok(grid.clone())
    }

    fn name(&self) -> &str {
        "mask-image"
    }

    fn is_initialized(&self) -> bool {
        self.grid.is_some()
    }
}
