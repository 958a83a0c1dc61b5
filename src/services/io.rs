//! Image I/O operations service
//!
//! File access for hosts. The compositing stages never touch the filesystem;
//! they work on `RasterImage` values handed to them by this layer.

use crate::{
    config::OutputFormat,
    error::{BgEraseError, Result},
    services::OutputFormatHandler,
    types::RasterImage,
};
use image::DynamicImage;
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Falls back to content-based format detection when the extension is
    /// missing or wrong.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bg_erase::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("portrait.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(BgEraseError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let decoded = match image::open(path_ref) {
            Ok(img) => img,
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    BgEraseError::file_io_error("read image data", path_ref, &io_err)
                })?;
                image::load_from_memory(&data)
                    .map_err(|content_err| BgEraseError::image_load_error(path_ref, content_err))?
            },
        };

        Ok(RasterImage::from_dynamic(&decoded))
    }

    /// Encode `image` in memory
    pub fn encode(image: &RasterImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        let dynamic = OutputFormatHandler::convert_format(image, format)?;
        encode_dynamic(&dynamic, format, jpeg_quality)
    }

    /// Save an image, creating parent directories as needed
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bg_erase::{services::ImageIOService, Channels, OutputFormat, RasterImage};
    ///
    /// let image = RasterImage::solid(100, 100, Channels::Rgb, &[1.0, 1.0, 1.0])?;
    /// ImageIOService::save_image(&image, "out/white.png", OutputFormat::Png, 90)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn save_image<P: AsRef<Path>>(
        image: &RasterImage,
        path: P,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BgEraseError::file_io_error("create output directory", parent, &e)
            })?;
        }

        let bytes = Self::encode(image, format, jpeg_quality)?;
        std::fs::write(path_ref, &bytes)
            .map_err(|e| BgEraseError::file_io_error("write image", path_ref, &e))?;

        log::debug!(
            "Saved {}x{} {} image to {} ({} bytes)",
            image.width(),
            image.height(),
            format,
            path_ref.display(),
            bytes.len()
        );
        Ok(())
    }
}

fn encode_dynamic(image: &DynamicImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    match format {
        OutputFormat::Png => image.write_to(&mut cursor, image::ImageFormat::Png)?,
        OutputFormat::Jpeg => {
            let jpeg_encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, jpeg_quality);
            image.write_with_encoder(jpeg_encoder)?;
        },
        OutputFormat::WebP => image.write_to(&mut cursor, image::ImageFormat::WebP)?,
        OutputFormat::Tiff => image.write_to(&mut cursor, image::ImageFormat::Tiff)?,
    }

    Ok(buffer)
}
