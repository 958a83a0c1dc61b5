//! Raster resampling
//!
//! Masks and backgrounds are usually upscaled from small model outputs or
//! catalogue assets, so the default filter is bilinear (`Triangle` in the
//! `image` crate) rather than nearest-neighbour.

use crate::{
    error::{BgEraseError, Result},
    types::{Channels, RasterImage},
    utils::NumericValidator,
};
use image::{
    imageops::{self, FilterType},
    ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba,
};
use serde::{Deserialize, Serialize};

/// Interpolation used when resizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Linear interpolation over a triangle kernel
    #[default]
    Bilinear,
    /// Cubic interpolation
    CatmullRom,
    /// Windowed sinc, sharpest but may ring near hard edges
    Lanczos3,
}

impl ResampleFilter {
    fn filter_type(self) -> FilterType {
        match self {
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Resize with the default bilinear filter
///
/// # Errors
/// - `InvalidDimensions` if either target dimension is 0
/// - `EmptyImage` if the source has zero area
pub fn resize(image: &RasterImage, target_width: u32, target_height: u32) -> Result<RasterImage> {
    ImageResampler::default().resize(image, target_width, target_height)
}

/// Scale both dimensions by `percentage` (1.0 keeps the size)
///
/// Each dimension is rounded and never drops below one pixel.
pub fn resize_by_percentage(image: &RasterImage, percentage: f32) -> Result<RasterImage> {
    NumericValidator::validate_finite(percentage, "percentage")?;
    if percentage <= 0.0 {
        return Err(BgEraseError::invalid_parameter(format!(
            "percentage must be positive, got {}",
            percentage
        )));
    }

    let width = scaled_dimension(image.width(), percentage);
    let height = scaled_dimension(image.height(), percentage);
    resize(image, width, height)
}

/// Resize to `target_width`, keeping the aspect ratio
pub fn resize_to_width(image: &RasterImage, target_width: u32) -> Result<RasterImage> {
    if image.is_empty() {
        return Err(BgEraseError::empty_image("cannot resize an image with zero area"));
    }
    let ratio = target_width as f32 / image.width() as f32;
    let height = scaled_dimension(image.height(), ratio);
    resize(image, target_width, height)
}

fn scaled_dimension(dimension: u32, factor: f32) -> u32 {
    ((dimension as f32 * factor).round() as u32).max(1)
}

/// Resizes rasters of any channel layout with a fixed filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageResampler {
    filter: ResampleFilter,
}

impl ImageResampler {
    #[must_use]
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }

    #[must_use]
    pub fn filter(&self) -> ResampleFilter {
        self.filter
    }

    /// Resize `image` to exactly `target_width` x `target_height`
    ///
    /// Same-size requests return an identical copy.
    pub fn resize(
        &self,
        image: &RasterImage,
        target_width: u32,
        target_height: u32,
    ) -> Result<RasterImage> {
        NumericValidator::validate_dimensions(target_width, target_height)?;
        if image.is_empty() {
            return Err(BgEraseError::empty_image("cannot resize an image with zero area"));
        }

        if image.dimensions() == (target_width, target_height) {
            return Ok(image.clone());
        }

        let filter = self.filter.filter_type();
        let data = match image.channels() {
            Channels::Luma => resize_plane::<Luma<f32>>(image, target_width, target_height, filter)?,
            Channels::LumaAlpha => {
                resize_plane::<LumaA<f32>>(image, target_width, target_height, filter)?
            },
            Channels::Rgb => resize_plane::<Rgb<f32>>(image, target_width, target_height, filter)?,
            Channels::Rgba => resize_plane::<Rgba<f32>>(image, target_width, target_height, filter)?,
        };

        RasterImage::new(target_width, target_height, image.channels(), data)
    }
}

fn resize_plane<P>(
    image: &RasterImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<Vec<f32>>
where
    P: Pixel<Subpixel = f32> + 'static,
{
    let buffer: ImageBuffer<P, Vec<f32>> =
        ImageBuffer::from_raw(image.width(), image.height(), image.data().to_vec()).ok_or_else(
            || BgEraseError::invalid_dimensions("sample buffer does not match image size"),
        )?;

    Ok(imageops::resize(&buffer, target_width, target_height, filter).into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RasterImage {
        RasterImage::from_fn(width, height, Channels::Luma, |x, _, p| {
            p[0] = x as f32 / (width - 1) as f32;
        })
        .unwrap()
    }

    #[test]
    fn test_output_matches_requested_size() {
        let img = RasterImage::solid(7, 5, Channels::Rgb, &[0.2, 0.4, 0.6]).unwrap();
        for (w, h) in [(1, 1), (3, 11), (64, 2), (7, 5), (100, 100)] {
            let out = resize(&img, w, h).unwrap();
            assert_eq!(out.dimensions(), (w, h));
            assert_eq!(out.channels(), Channels::Rgb);
        }
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let img = RasterImage::solid(2, 2, Channels::Luma, &[0.5]).unwrap();
        assert!(matches!(resize(&img, 0, 4), Err(BgEraseError::InvalidDimensions(_))));
        assert!(matches!(resize(&img, 4, 0), Err(BgEraseError::InvalidDimensions(_))));
    }

    #[test]
    fn test_same_size_is_identity() {
        let img = gradient(9, 4);
        assert_eq!(resize(&img, 9, 4).unwrap(), img);
    }

    #[test]
    fn test_resize_is_deterministic() {
        let img = gradient(16, 16);
        let a = resize(&img, 37, 23).unwrap();
        let b = resize(&img, 37, 23).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_upscale_interpolates() {
        let img = RasterImage::new(2, 1, Channels::Luma, vec![0.0, 1.0]).unwrap();
        let out = resize(&img, 8, 1).unwrap();
        // Bilinear upscaling yields intermediate values, not a hard step
        assert!(out.data().iter().any(|&v| v > 0.05 && v < 0.95));
        assert!(out.data().windows(2).all(|w| w[0] <= w[1] + 1e-6));
    }

    #[test]
    fn test_percentage_and_width_helpers() {
        let img = gradient(200, 100);
        let shrunk = resize_by_percentage(&img, 0.99).unwrap();
        assert_eq!(shrunk.dimensions(), (198, 99));

        let fitted = resize_to_width(&img, 50).unwrap();
        assert_eq!(fitted.dimensions(), (50, 25));

        assert!(resize_by_percentage(&img, 0.0).is_err());
        assert!(resize_by_percentage(&img, f32::NAN).is_err());
    }

    #[test]
    fn test_all_filters_produce_target_size() {
        let img = gradient(10, 10);
        for filter in [
            ResampleFilter::Bilinear,
            ResampleFilter::CatmullRom,
            ResampleFilter::Lanczos3,
        ] {
            let out = ImageResampler::new(filter).resize(&img, 31, 17).unwrap();
            assert_eq!(out.dimensions(), (31, 17));
            assert!(out.data().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }
}
