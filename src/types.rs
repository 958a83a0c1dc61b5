//! Core types for mask building and compositing

use crate::error::{BgEraseError, Result};
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageBuffer};
use ndarray::{Array2, Array4, Axis};
use serde::{Deserialize, Serialize};

/// Rec. 709 luma weights used whenever a colour image is reduced to one channel
const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Channel layout of a [`RasterImage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channels {
    /// Single grey channel (masks)
    Luma,
    /// Grey plus alpha
    LumaAlpha,
    /// Red, green, blue
    Rgb,
    /// Red, green, blue, alpha
    Rgba,
}

impl Channels {
    /// Number of interleaved samples per pixel
    #[must_use]
    pub fn count(self) -> usize {
        match self {
            Self::Luma => 1,
            Self::LumaAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    #[must_use]
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::LumaAlpha | Self::Rgba)
    }

    #[must_use]
    pub fn has_color(self) -> bool {
        matches!(self, Self::Rgb | Self::Rgba)
    }

    /// Number of colour (non-alpha) samples per pixel
    #[must_use]
    pub fn color_count(self) -> usize {
        if self.has_alpha() {
            self.count() - 1
        } else {
            self.count()
        }
    }
}

/// A width x height grid of interleaved `f32` samples normalized to 0.0-1.0
///
/// `RasterImage` is a value type: resize, blur and blend all return a new image
/// and never mutate their inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<f32>,
}

impl RasterImage {
    /// Create an image from interleaved samples
    ///
    /// Zero-area images are allowed here; pipeline stages reject them where an
    /// empty input makes no sense.
    pub fn new(width: u32, height: u32, channels: Channels, data: Vec<f32>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(channels.count()))
            .ok_or_else(|| {
                BgEraseError::invalid_dimensions(format!(
                    "{}x{} image is too large to allocate",
                    width, height
                ))
            })?;

        if data.len() != expected {
            return Err(BgEraseError::invalid_dimensions(format!(
                "{}x{} {:?} image needs {} samples, got {}",
                width,
                height,
                channels,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Create an image filled with a single pixel value
    pub fn solid(width: u32, height: u32, channels: Channels, pixel: &[f32]) -> Result<Self> {
        if pixel.len() != channels.count() {
            return Err(BgEraseError::invalid_parameter(format!(
                "{:?} pixel needs {} samples, got {}",
                channels,
                channels.count(),
                pixel.len()
            )));
        }

        let area = width as usize * height as usize;
        let mut data = Vec::with_capacity(area * pixel.len());
        for _ in 0..area {
            data.extend_from_slice(pixel);
        }

        Self::new(width, height, channels, data)
    }

    /// Build an image by evaluating `f(x, y, pixel)` for every position
    pub fn from_fn<F>(width: u32, height: u32, channels: Channels, mut f: F) -> Result<Self>
    where
        F: FnMut(u32, u32, &mut [f32]),
    {
        let stride = channels.count();
        let mut data = vec![0.0; width as usize * height as usize * stride];

        for (index, pixel) in data.chunks_exact_mut(stride).enumerate() {
            let x = (index % width as usize) as u32;
            let y = (index / width as usize) as u32;
            f(x, y, pixel);
        }

        Self::new(width, height, channels, data)
    }

    /// Convert a decoded image into normalized samples, keeping its channel layout
    #[must_use]
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let color = image.color();
        let (width, height) = (image.width(), image.height());

        let (channels, data) = match (color.has_color(), color.has_alpha()) {
            (false, false) => (Channels::Luma, image.to_luma32f().into_raw()),
            (false, true) => (Channels::LumaAlpha, image.to_luma_alpha32f().into_raw()),
            (true, false) => (Channels::Rgb, image.to_rgb32f().into_raw()),
            (true, true) => (Channels::Rgba, image.to_rgba32f().into_raw()),
        };

        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Quantize to an 8-bit `DynamicImage` with the same channel layout
    pub fn to_dynamic_image(&self) -> Result<DynamicImage> {
        let bytes: Vec<u8> = self.data.iter().map(|&v| quantize(v)).collect();
        let (w, h) = (self.width, self.height);
        let mismatch = || BgEraseError::invalid_dimensions("sample buffer does not match image size");

        let image = match self.channels {
            Channels::Luma => {
                DynamicImage::ImageLuma8(ImageBuffer::from_raw(w, h, bytes).ok_or_else(mismatch)?)
            },
            Channels::LumaAlpha => {
                DynamicImage::ImageLumaA8(ImageBuffer::from_raw(w, h, bytes).ok_or_else(mismatch)?)
            },
            Channels::Rgb => {
                DynamicImage::ImageRgb8(ImageBuffer::from_raw(w, h, bytes).ok_or_else(mismatch)?)
            },
            Channels::Rgba => {
                DynamicImage::ImageRgba8(ImageBuffer::from_raw(w, h, bytes).ok_or_else(mismatch)?)
            },
        };

        Ok(image)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Interleaved samples in row-major order
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// True when the image has zero area
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels (not samples)
    #[must_use]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Samples of the pixel at `(x, y)`, or `None` outside the image
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[f32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let stride = self.channels.count();
        let start = (y as usize * self.width as usize + x as usize) * stride;
        self.data.get(start..start + stride)
    }

    /// Luminance of the pixel at `(x, y)`; alpha is ignored
    #[must_use]
    pub fn luminance_at(&self, x: u32, y: u32) -> Option<f32> {
        self.pixel(x, y).map(|p| luminance(p, self.channels))
    }

    /// Reduce to a single luminance channel
    #[must_use]
    pub fn to_luma(&self) -> Self {
        if self.channels == Channels::Luma {
            return self.clone();
        }

        let data = self
            .data
            .chunks_exact(self.channels.count())
            .map(|p| luminance(p, self.channels))
            .collect();

        Self {
            width: self.width,
            height: self.height,
            channels: Channels::Luma,
            data,
        }
    }

    /// Convert to another channel layout
    ///
    /// Grey is replicated into RGB, colour is reduced to luminance, missing
    /// alpha becomes fully opaque and dropped alpha is discarded.
    #[must_use]
    pub fn convert(&self, target: Channels) -> Self {
        if target == self.channels {
            return self.clone();
        }

        let source = self.channels;
        let mut data = Vec::with_capacity(self.area() * target.count());

        for p in self.data.chunks_exact(source.count()) {
            let alpha = if source.has_alpha() {
                p.last().copied().unwrap_or(1.0)
            } else {
                1.0
            };

            match target {
                Channels::Luma => data.push(luminance(p, source)),
                Channels::LumaAlpha => {
                    data.push(luminance(p, source));
                    data.push(alpha);
                },
                Channels::Rgb | Channels::Rgba => {
                    if source.has_color() {
                        data.extend_from_slice(p.get(..3).unwrap_or(&[0.0, 0.0, 0.0]));
                    } else {
                        let v = p.first().copied().unwrap_or(0.0);
                        data.extend_from_slice(&[v, v, v]);
                    }
                    if target == Channels::Rgba {
                        data.push(alpha);
                    }
                },
            }
        }

        Self {
            width: self.width,
            height: self.height,
            channels: target,
            data,
        }
    }

    /// Mean over all samples
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| f64::from(v)).sum();
        (sum / self.data.len() as f64) as f32
    }

    /// Population variance over all samples
    #[must_use]
    pub fn variance(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = f64::from(self.mean());
        let sum: f64 = self
            .data
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum();
        (sum / self.data.len() as f64) as f32
    }

    /// Mean absolute per-sample difference, `None` if layouts differ
    #[must_use]
    pub fn mean_abs_difference(&self, other: &Self) -> Option<f32> {
        if self.dimensions() != other.dimensions() || self.channels != other.channels {
            return None;
        }
        if self.data.is_empty() {
            return Some(0.0);
        }
        let sum: f64 = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f64::from((a - b).abs()))
            .sum();
        Some((sum / self.data.len() as f64) as f32)
    }

    /// Largest absolute per-sample difference, `None` if layouts differ
    #[must_use]
    pub fn max_abs_difference(&self, other: &Self) -> Option<f32> {
        if self.dimensions() != other.dimensions() || self.channels != other.channels {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| (a - b).abs())
                .fold(0.0, f32::max),
        )
    }
}

fn luminance(pixel: &[f32], channels: Channels) -> f32 {
    if channels.has_color() {
        pixel
            .iter()
            .zip(LUMA_WEIGHTS)
            .map(|(&v, w)| v * w)
            .sum()
    } else {
        pixel.first().copied().unwrap_or(0.0)
    }
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Raw per-pixel model output for one semantic class, before normalization
///
/// Rows are image rows (height), columns are image columns (width). Values
/// may lie in any finite interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceGrid {
    values: Array2<f32>,
}

impl ConfidenceGrid {
    /// Wrap a 2-D array of confidence values
    pub fn new(values: Array2<f32>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows == 0 || cols == 0 {
            return Err(BgEraseError::empty_image(format!(
                "confidence grid has zero area ({}x{})",
                cols, rows
            )));
        }

        if u32::try_from(rows).is_err() || u32::try_from(cols).is_err() {
            return Err(BgEraseError::invalid_dimensions(format!(
                "confidence grid {}x{} exceeds u32 dimensions",
                cols, rows
            )));
        }

        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(BgEraseError::invalid_parameter(format!(
                "confidence grid contains non-finite value {}",
                bad
            )));
        }

        Ok(Self { values })
    }

    /// Build a grid from row-major values
    pub fn from_vec(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let array = Array2::from_shape_vec((height as usize, width as usize), values).map_err(|e| {
            BgEraseError::invalid_dimensions(format!(
                "cannot shape {}x{} confidence grid: {}",
                width, height, e
            ))
        })?;
        Self::new(array)
    }

    /// Extract the probability map from an NCHW model output of shape `(1, 1, H, W)`
    pub fn from_model_output(tensor: &Array4<f32>) -> Result<Self> {
        let (n, c, _, _) = tensor.dim();
        if n != 1 || c != 1 {
            return Err(BgEraseError::invalid_dimensions(format!(
                "expected model output of shape (1, 1, H, W), got {:?}",
                tensor.shape()
            )));
        }

        let plane = tensor.index_axis(Axis(0), 0).index_axis(Axis(0), 0).to_owned();
        Self::new(plane)
    }

    /// Select one class from NCHW per-class scores of shape `(1, C, H, W)`
    ///
    /// A location is 1.0 when `class_index` has the highest score there and
    /// 0.0 otherwise. Ties go to the lowest class index.
    pub fn from_class_scores(tensor: &Array4<f32>, class_index: usize) -> Result<Self> {
        let (n, classes, height, width) = tensor.dim();
        if n != 1 || classes == 0 {
            return Err(BgEraseError::invalid_dimensions(format!(
                "expected class scores of shape (1, C, H, W), got {:?}",
                tensor.shape()
            )));
        }
        if class_index >= classes {
            return Err(BgEraseError::invalid_parameter(format!(
                "class index {} out of range for {} classes",
                class_index, classes
            )));
        }

        let scores = tensor.index_axis(Axis(0), 0);
        let values = Array2::from_shape_fn((height, width), |(y, x)| {
            let mut best = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (class, score) in scores.slice(ndarray::s![.., y, x]).iter().enumerate() {
                if *score > best_score {
                    best = class;
                    best_score = *score;
                }
            }
            if best == class_index {
                1.0
            } else {
                0.0
            }
        });

        Self::new(values)
    }

    /// Convert a per-pixel class label map into a binary grid for one class
    pub fn from_label_map(labels: &Array2<u32>, class_index: u32) -> Result<Self> {
        Self::new(labels.mapv(|label| if label == class_index { 1.0 } else { 0.0 }))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.values.ncols() as u32
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.values.nrows() as u32
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    #[must_use]
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// Value at column `x`, row `y`
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        self.values.get((y as usize, x as usize)).copied()
    }

    /// Observed `(min, max)` of the grid
    #[must_use]
    pub fn value_range(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Per-request blend settings
///
/// The two sigmas are independent: `sigma_main` softens the subject edge,
/// `sigma_background` defocuses the replacement background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendParameters {
    /// Gaussian sigma applied to the mask
    pub sigma_main: f32,
    /// Gaussian sigma applied to the background
    pub sigma_background: f32,
    /// Identifier of the background asset
    pub background_id: String,
}

impl BlendParameters {
    pub const DEFAULT_SIGMA_MAIN: f32 = 20.0;
    pub const DEFAULT_SIGMA_BACKGROUND: f32 = 1.0;

    #[must_use]
    pub fn new<S: Into<String>>(background_id: S) -> Self {
        Self {
            sigma_main: Self::DEFAULT_SIGMA_MAIN,
            sigma_background: Self::DEFAULT_SIGMA_BACKGROUND,
            background_id: background_id.into(),
        }
    }

    #[must_use]
    pub fn with_sigma_main(mut self, sigma: f32) -> Self {
        self.sigma_main = sigma;
        self
    }

    #[must_use]
    pub fn with_sigma_background(mut self, sigma: f32) -> Self {
        self.sigma_background = sigma;
        self
    }

    /// Check both sigmas and the background identifier
    pub fn validate(&self) -> Result<()> {
        crate::utils::NumericValidator::validate_sigma(self.sigma_main)?;
        crate::utils::NumericValidator::validate_sigma(self.sigma_background)?;
        if self.background_id.trim().is_empty() {
            return Err(BgEraseError::invalid_parameter(
                "background identifier must not be empty",
            ));
        }
        Ok(())
    }
}

impl Default for BlendParameters {
    fn default() -> Self {
        Self::new("transparent_white")
    }
}

/// Timing breakdown for one segment-and-composite run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Segmentation backend inference
    pub inference_ms: u64,
    /// Confidence grid to mask conversion
    pub mask_ms: u64,
    /// Resample, blur and blend
    pub composite_ms: u64,
    /// Hard cutout (runs alongside the blend)
    pub cutout_ms: Option<u64>,
    /// Total end-to-end time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time not attributed to any measured stage
    ///
    /// The cutout overlaps the blend, so it is not subtracted.
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.inference_ms + self.mask_ms + self.composite_ms;
        self.total_ms.saturating_sub(measured)
    }
}

/// Metadata describing how a composite was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetadata {
    /// Name of the segmentation backend
    pub backend_name: String,
    /// Background asset used for the blend
    pub background_id: String,
    pub sigma_main: f32,
    pub sigma_background: f32,
    /// Output dimensions (always the foreground's)
    pub dimensions: (u32, u32),
    pub timings: ProcessingTimings,
    pub completed_at: DateTime<Utc>,
}

impl CompositeMetadata {
    #[must_use]
    pub fn new(backend_name: String, params: &BlendParameters, dimensions: (u32, u32)) -> Self {
        Self {
            backend_name,
            background_id: params.background_id.clone(),
            sigma_main: params.sigma_main,
            sigma_background: params.sigma_background,
            dimensions,
            timings: ProcessingTimings::new(),
            completed_at: Utc::now(),
        }
    }
}

/// Output of a composite request; fully owned by the caller
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// The blended image, same size as the foreground
    pub image: RasterImage,
    /// Hard-edged RGBA cutout, when requested
    pub cutout: Option<RasterImage>,
    pub metadata: CompositeMetadata,
}

impl CompositeResult {
    #[must_use]
    pub fn new(image: RasterImage, cutout: Option<RasterImage>, metadata: CompositeMetadata) -> Self {
        Self {
            image,
            cutout,
            metadata,
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// One-line timing summary for logs
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let cutout = t
            .cutout_ms
            .map_or_else(|| "skipped".to_string(), |ms| format!("{}ms", ms));
        format!(
            "inference {}ms, mask {}ms, composite {}ms, cutout {}, total {}ms",
            t.inference_ms, t.mask_ms, t.composite_ms, cutout, t.total_ms
        )
    }
}
