//! Configuration types for segmentation and compositing

use crate::{
    error::{BgEraseError, Result},
    types::BlendParameters,
    utils::NumericValidator,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output image format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, alpha is dropped)
    Jpeg,
    /// WebP with alpha channel transparency
    WebP,
    /// TIFF with alpha channel transparency and lossless compression
    Tiff,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::WebP => write!(f, "webp"),
            Self::Tiff => write!(f, "tiff"),
        }
    }
}

/// Configuration for a [`BackgroundEraser`](crate::processor::BackgroundEraser)
///
/// # Mask range
///
/// Backend confidences are normalized into a mask over `[low, high]`:
/// - `auto_range = true` uses each grid's observed range
/// - otherwise `mask_low` / `mask_high` when set
/// - otherwise the backend's own [`value_range`](crate::inference::SegmentationBackend::value_range)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Lower bound of the confidence range (None = backend default)
    pub mask_low: Option<f32>,

    /// Upper bound of the confidence range (None = backend default)
    pub mask_high: Option<f32>,

    /// Normalize each grid over its own observed min and max
    pub auto_range: bool,

    /// Mask level at or above which a pixel belongs to the cutout
    pub cutout_threshold: f32,

    /// Produce a hard-edged cutout alongside every composite
    pub produce_cutout: bool,

    /// Blend parameters used when the caller does not pass any
    pub blend: BlendParameters,

    /// Output format
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            mask_low: None,
            mask_high: None,
            auto_range: false,
            cutout_threshold: 0.5,
            produce_cutout: true,
            blend: BlendParameters::default(),
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
        }
    }
}

impl ProcessorConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use bg_erase::{OutputFormat, ProcessorConfig};
    ///
    /// let config = ProcessorConfig::builder()
    ///     .mask_range(0.0, 20.0)
    ///     .sigma_main(8.0)
    ///     .output_format(OutputFormat::Jpeg)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.blend.sigma_main, 8.0);
    /// ```
    #[must_use]
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - `InvalidRange` when both bounds are set and `mask_high <= mask_low`
    /// - `InvalidParameter` for a bad cutout threshold or blend sigma
    /// - `InvalidConfig` for a JPEG quality above 100
    pub fn validate(&self) -> Result<()> {
        for bound in [self.mask_low, self.mask_high].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(BgEraseError::invalid_range(format!(
                    "mask bound must be finite, got {}",
                    bound
                )));
            }
        }
        if let (Some(low), Some(high)) = (self.mask_low, self.mask_high) {
            NumericValidator::validate_interval(low, high)?;
        }

        NumericValidator::validate_unit_interval(self.cutout_threshold, "cutout threshold")?;
        self.blend.validate()?;

        if self.jpeg_quality > 100 {
            return Err(BgEraseError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(90),
            ));
        }

        Ok(())
    }

    /// Resolve the normalization range given the backend's own range
    #[must_use]
    pub fn mask_range(&self, backend_range: (f32, f32)) -> (f32, f32) {
        (
            self.mask_low.unwrap_or(backend_range.0),
            self.mask_high.unwrap_or(backend_range.1),
        )
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| BgEraseError::file_io_error("read config file", path, &e))?;
        Self::from_json_str(&json)
    }

    /// Pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for `ProcessorConfig`
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both confidence range bounds
    #[must_use]
    pub fn mask_range(mut self, low: f32, high: f32) -> Self {
        self.config.mask_low = Some(low);
        self.config.mask_high = Some(high);
        self
    }

    /// Normalize each grid over its observed range
    #[must_use]
    pub fn auto_range(mut self, enabled: bool) -> Self {
        self.config.auto_range = enabled;
        self
    }

    /// Set the cutout threshold (clamped to 0.0-1.0)
    #[must_use]
    pub fn cutout_threshold(mut self, threshold: f32) -> Self {
        self.config.cutout_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Enable or disable the hard cutout
    #[must_use]
    pub fn produce_cutout(mut self, enabled: bool) -> Self {
        self.config.produce_cutout = enabled;
        self
    }

    /// Replace the default blend parameters
    #[must_use]
    pub fn blend(mut self, params: BlendParameters) -> Self {
        self.config.blend = params;
        self
    }

    /// Set the default mask sigma (negative values become 0)
    #[must_use]
    pub fn sigma_main(mut self, sigma: f32) -> Self {
        self.config.blend.sigma_main = sigma.max(0.0);
        self
    }

    /// Set the default background sigma (negative values become 0)
    #[must_use]
    pub fn sigma_background(mut self, sigma: f32) -> Self {
        self.config.blend.sigma_background = sigma.max(0.0);
        self
    }

    /// Set the default background identifier
    #[must_use]
    pub fn background_id<S: Into<String>>(mut self, id: S) -> Self {
        self.config.blend.background_id = id.into();
        self
    }

    /// Set output format
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set JPEG quality
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.min(100);
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any error from [`ProcessorConfig::validate`]
    pub fn build(self) -> Result<ProcessorConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.output_format, OutputFormat::Png);
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.cutout_threshold, 0.5);
        assert!(config.produce_cutout);
        assert!(!config.auto_range);
        assert_eq!(config.blend, BlendParameters::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ProcessorConfig::builder()
            .mask_range(0.0, 20.0)
            .sigma_main(5.0)
            .sigma_background(-2.0)
            .background_id("snow")
            .cutout_threshold(1.7)
            .jpeg_quality(150)
            .output_format(OutputFormat::Jpeg)
            .build()
            .unwrap();

        assert_eq!(config.mask_range((0.0, 1.0)), (0.0, 20.0));
        assert_eq!(config.blend.sigma_main, 5.0);
        assert_eq!(config.blend.sigma_background, 0.0);
        assert_eq!(config.blend.background_id, "snow");
        assert_eq!(config.cutout_threshold, 1.0);
        assert_eq!(config.jpeg_quality, 100);
    }

    #[test]
    fn test_mask_range_falls_back_to_backend() {
        let mut config = ProcessorConfig::default();
        assert_eq!(config.mask_range((0.0, 20.0)), (0.0, 20.0));

        config.mask_high = Some(0.8);
        assert_eq!(config.mask_range((0.0, 1.0)), (0.0, 0.8));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProcessorConfig::default();
        config.jpeg_quality = 150;
        assert!(matches!(config.validate(), Err(BgEraseError::InvalidConfig(_))));

        let result = ProcessorConfig::builder().mask_range(0.5, 0.5).build();
        assert!(matches!(result, Err(BgEraseError::InvalidRange(_))));

        let mut config = ProcessorConfig::default();
        config.cutout_threshold = -0.1;
        assert!(matches!(config.validate(), Err(BgEraseError::InvalidParameter(_))));

        let mut config = ProcessorConfig::default();
        config.blend.sigma_main = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = ProcessorConfig::builder()
            .mask_range(0.0, 20.0)
            .sigma_main(12.5)
            .background_id("starfield")
            .output_format(OutputFormat::WebP)
            .produce_cutout(false)
            .build()
            .unwrap();

        let json = config.to_json_string().unwrap();
        let parsed = ProcessorConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ProcessorConfig::from_json_str(r#"{ "auto_range": true }"#).unwrap();
        assert!(config.auto_range);
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.blend.sigma_main, BlendParameters::DEFAULT_SIGMA_MAIN);

        assert!(matches!(
            ProcessorConfig::from_json_str(r#"{ "mask_low": 1.0, "mask_high": 0.0 }"#),
            Err(BgEraseError::InvalidRange(_))
        ));
        assert!(matches!(
            ProcessorConfig::from_json_str("{ not json"),
            Err(BgEraseError::Serialization(_))
        ));
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "cutout_threshold": 0.7 }"#).unwrap();

        let config = ProcessorConfig::from_json_file(&path).unwrap();
        assert_eq!(config.cutout_threshold, 0.7);

        assert!(matches!(
            ProcessorConfig::from_json_file(dir.path().join("missing.json")),
            Err(BgEraseError::Io(_))
        ));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::default(), OutputFormat::Png);
        assert_eq!(OutputFormat::WebP.to_string(), "webp");
        assert_eq!(OutputFormat::Jpeg.to_string(), "jpeg");
    }
}
