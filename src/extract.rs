//! Hard-edged foreground cutout

use crate::{
    error::{BgEraseError, Result},
    resample::ImageResampler,
    types::{Channels, RasterImage},
    utils::NumericValidator,
};
use tracing::{debug, instrument};

/// Cut the subject out with the default 0.5 threshold
///
/// # Errors
/// - `EmptyImage` if the image or mask has zero area
/// - `NoSubjectDetected` if no mask sample reaches the threshold
pub fn extract_foreground(image: &RasterImage, mask: &RasterImage) -> Result<RasterImage> {
    ForegroundExtractor::default().extract(image, mask)
}

/// Produces RGBA cutouts where alpha is either 0 or 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForegroundExtractor {
    threshold: f32,
}

impl ForegroundExtractor {
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    /// Pixels whose mask sample is `>= threshold` belong to the subject
    pub fn new(threshold: f32) -> Result<Self> {
        let threshold = NumericValidator::validate_unit_interval(threshold, "threshold")?;
        Ok(Self { threshold })
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Cut out the subject of `image`
    ///
    /// The mask is reduced to luminance and resampled to the image size. The
    /// image's alpha channel, if any, is replaced by the hard mask.
    #[instrument(level = "debug", skip_all, fields(width = image.width(), height = image.height(), threshold = self.threshold))]
    pub fn extract(&self, image: &RasterImage, mask: &RasterImage) -> Result<RasterImage> {
        if image.is_empty() || mask.is_empty() {
            return Err(BgEraseError::empty_image(format!(
                "cannot cut out {}x{} image with {}x{} mask",
                image.width(),
                image.height(),
                mask.width(),
                mask.height()
            )));
        }

        let (width, height) = image.dimensions();
        let mask = ImageResampler::default().resize(&mask.to_luma(), width, height)?;
        let rgb = image.convert(Channels::Rgb);

        let mut kept = 0usize;
        let mut data = Vec::with_capacity(image.area() * Channels::Rgba.count());
        for (pixel, &m) in rgb.data().chunks_exact(3).zip(mask.data()) {
            if m >= self.threshold {
                kept += 1;
                data.extend_from_slice(pixel);
                data.push(1.0);
            } else {
                data.extend_from_slice(&[0.0, 0.0, 0.0, 0.0]);
            }
        }

        if kept == 0 {
            return Err(BgEraseError::no_subject(format!(
                "no mask sample reaches threshold {}",
                self.threshold
            )));
        }

        debug!(kept, total = image.area(), "extracted foreground");
        RasterImage::new(width, height, Channels::Rgba, data)
    }
}

impl Default for ForegroundExtractor {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}
