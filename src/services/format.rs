//! Output format handling service
//!
//! Keeps format conversion out of the compositing code.

use crate::{
    config::OutputFormat,
    error::Result,
    types::{Channels, RasterImage},
};
use image::DynamicImage;

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Quantize `image` into a `DynamicImage` suitable for `format`
    ///
    /// JPEG cannot carry alpha, so RGBA and grey-alpha images lose it.
    ///
    /// # Examples
    /// ```rust
    /// use bg_erase::{services::OutputFormatHandler, Channels, OutputFormat, RasterImage};
    ///
    /// let image = RasterImage::solid(2, 2, Channels::Rgba, &[1.0, 0.0, 0.0, 0.5]).unwrap();
    /// let jpeg = OutputFormatHandler::convert_format(&image, OutputFormat::Jpeg).unwrap();
    /// assert!(!jpeg.color().has_alpha());
    /// ```
    pub fn convert_format(image: &RasterImage, format: OutputFormat) -> Result<DynamicImage> {
        match format {
            OutputFormat::Png | OutputFormat::WebP | OutputFormat::Tiff => image.to_dynamic_image(),
            OutputFormat::Jpeg => {
                let target = if image.channels().has_color() {
                    Channels::Rgb
                } else {
                    Channels::Luma
                };
                image.convert(target).to_dynamic_image()
            },
        }
    }

    /// File extension (without the dot) for `format`
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// Guess the output format from a file extension
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<OutputFormat> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::WebP),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            _ => None,
        }
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::WebP | OutputFormat::Tiff => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Warn when a cutout is about to be written in a format without alpha
    pub fn validate_for_cutout(format: OutputFormat) {
        if !Self::supports_transparency(format) {
            log::warn!(
                "Output format {:?} does not support transparency. The cutout will be written without its alpha channel.",
                format
            );
        }
    }
}
