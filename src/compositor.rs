//! Alpha compositing of a foreground over a replacement background

use crate::{
    assets::AssetStore,
    blur::{gaussian_blur, gaussian_blur_cancellable},
    error::{BgEraseError, Result},
    resample::ImageResampler,
    types::{BlendParameters, RasterImage},
    utils::NumericValidator,
};
use log::debug;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, span, Level};

/// Mask samples this close to 0 or 1 are treated as exactly 0 or 1
const MASK_SNAP_EPSILON: f32 = 1e-6;

/// Composite `foreground` over `background` using `mask` as per-pixel alpha
///
/// The mask and background are resampled to the foreground size, the mask is
/// blurred with `sigma_main` and the background with `sigma_background`, then
/// each channel is blended as `m * fg + (1 - m) * bg`.
///
/// # Errors
/// - `EmptyImage` if any input has zero area
/// - `InvalidParameter` for a negative or non-finite sigma
pub fn composite(
    foreground: &RasterImage,
    mask: &RasterImage,
    background: &RasterImage,
    sigma_main: f32,
    sigma_background: f32,
) -> Result<RasterImage> {
    Compositor::default().composite(foreground, mask, background, sigma_main, sigma_background)
}

/// Composite using blend parameters, resolving the background from `store`
///
/// # Errors
/// - `AssetNotFound` if the store has no background with the requested id
/// - any error from [`composite`]
pub fn composite_with(
    foreground: &RasterImage,
    mask: &RasterImage,
    params: &BlendParameters,
    store: &dyn AssetStore,
) -> Result<RasterImage> {
    Compositor::default().composite_with(foreground, mask, params, store)
}

/// Keep the subject in colour and turn the background grey
///
/// The mask is resampled to the image size but not blurred. Alpha, if
/// present, is left untouched.
pub fn desaturate_background(image: &RasterImage, mask: &RasterImage) -> Result<RasterImage> {
    ensure_not_empty(image, "image")?;
    ensure_not_empty(mask, "mask")?;

    let (width, height) = image.dimensions();
    let mask = ImageResampler::default().resize(&mask.to_luma(), width, height)?;
    let channels = image.channels();
    let color = channels.color_count();
    let grey = image.to_luma();

    let mut data = image.data().to_vec();
    for ((pixel, &m), &g) in data
        .chunks_exact_mut(channels.count())
        .zip(mask.data())
        .zip(grey.data())
    {
        let m = snap(m);
        for sample in pixel.iter_mut().take(color) {
            *sample = m * *sample + (1.0 - m) * g;
        }
    }

    RasterImage::new(width, height, channels, data)
}

/// Resample, blur and blend stages with a fixed resampling filter
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    resampler: ImageResampler,
    cancellation: Option<CancellationToken>,
}

impl Compositor {
    #[must_use]
    pub fn new(resampler: ImageResampler) -> Self {
        Self {
            resampler,
            cancellation: None,
        }
    }

    /// Abort blurring with `Cancelled` once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// See [`composite`]
    #[instrument(
        level = "debug",
        skip_all,
        fields(
            width = foreground.width(),
            height = foreground.height(),
            sigma_main,
            sigma_background
        )
    )]
    pub fn composite(
        &self,
        foreground: &RasterImage,
        mask: &RasterImage,
        background: &RasterImage,
        sigma_main: f32,
        sigma_background: f32,
    ) -> Result<RasterImage> {
        ensure_not_empty(foreground, "foreground")?;
        ensure_not_empty(mask, "mask")?;
        ensure_not_empty(background, "background")?;
        NumericValidator::validate_sigma(sigma_main)?;
        NumericValidator::validate_sigma(sigma_background)?;

        let (width, height) = foreground.dimensions();

        let alpha = {
            let _span = span!(Level::DEBUG, "mask_stage", sigma = %sigma_main).entered();
            let resized = self.resampler.resize(&mask.to_luma(), width, height)?;
            self.blur(&resized, sigma_main)?
        };

        let backdrop = {
            let _span = span!(Level::DEBUG, "background_stage", sigma = %sigma_background).entered();
            let converted = background.convert(foreground.channels());
            let resized = self.resampler.resize(&converted, width, height)?;
            self.blur(&resized, sigma_background)?
        };

        debug!(
            "Blending {}x{} {:?} foreground (mask sigma {}, background sigma {})",
            width,
            height,
            foreground.channels(),
            sigma_main,
            sigma_background
        );

        blend(foreground, &alpha, &backdrop)
    }

    /// See [`composite_with`]
    pub fn composite_with(
        &self,
        foreground: &RasterImage,
        mask: &RasterImage,
        params: &BlendParameters,
        store: &dyn AssetStore,
    ) -> Result<RasterImage> {
        params.validate()?;
        let background = store.load(&params.background_id)?;
        self.composite(
            foreground,
            mask,
            &background,
            params.sigma_main,
            params.sigma_background,
        )
    }

    fn blur(&self, image: &RasterImage, sigma: f32) -> Result<RasterImage> {
        match &self.cancellation {
            Some(token) => gaussian_blur_cancellable(image, sigma, token),
            None => gaussian_blur(image, sigma),
        }
    }
}

/// Per-channel `m * fg + (1 - m) * bg`; all three inputs share dimensions
fn blend(foreground: &RasterImage, alpha: &RasterImage, backdrop: &RasterImage) -> Result<RasterImage> {
    let channels = foreground.channels();
    let stride = channels.count();

    let mut data = Vec::with_capacity(foreground.data().len());
    for ((fg, bg), &m) in foreground
        .data()
        .chunks_exact(stride)
        .zip(backdrop.data().chunks_exact(stride))
        .zip(alpha.data())
    {
        let m = snap(m);
        data.extend(fg.iter().zip(bg).map(|(&f, &b)| m * f + (1.0 - m) * b));
    }

    RasterImage::new(foreground.width(), foreground.height(), channels, data)
}

fn snap(m: f32) -> f32 {
    let m = m.clamp(0.0, 1.0);
    if m < MASK_SNAP_EPSILON {
        0.0
    } else if m > 1.0 - MASK_SNAP_EPSILON {
        1.0
    } else {
        m
    }
}

fn ensure_not_empty(image: &RasterImage, role: &str) -> Result<()> {
    if image.is_empty() {
        return Err(BgEraseError::empty_image(format!(
            "{} has zero area ({}x{})",
            role,
            image.width(),
            image.height()
        )));
    }
    Ok(())
}
