//! Chroma-key backend
//!
//! Scores pixels by their colour distance from a key colour, which is enough
//! for studio shots against a green or blue screen. Distances are normalized
//! so that black to white is 1.0.

use crate::config::ProcessorConfig;
use crate::error::{BgEraseError, Result};
use crate::inference::SegmentationBackend;
use crate::types::{Channels, ConfidenceGrid, RasterImage};
use crate::utils::NumericValidator;
use instant::Duration;
use std::str::FromStr;

/// An sRGB key colour with samples in 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyColor(pub [f32; 3]);

impl KeyColor {
    pub const GREEN: Self = Self([0.0, 1.0, 0.0]);
    pub const BLUE: Self = Self([0.0, 0.0, 1.0]);

    /// Normalized Euclidean distance to `rgb`, in 0.0-1.0
    #[must_use]
    pub fn distance(&self, rgb: &[f32]) -> f32 {
        let sum: f32 = self
            .0
            .iter()
            .zip(rgb)
            .map(|(k, v)| (k - v) * (k - v))
            .sum();
        (sum / 3.0).sqrt()
    }
}

impl FromStr for KeyColor {
    type Err = BgEraseError;

    /// Parse `#rrggbb`, `rrggbb` or `#rgb`
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => {
                return Err(BgEraseError::invalid_parameter(format!(
                    "key colour must be #rgb or #rrggbb, got '{}'",
                    s
                )))
            },
        };

        let mut rgb = [0.0; 3];
        for (i, sample) in rgb.iter_mut().enumerate() {
            let byte = expanded
                .get(i * 2..i * 2 + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| {
                    BgEraseError::invalid_parameter(format!("invalid hex colour '{}'", s))
                })?;
            *sample = f32::from(byte) / 255.0;
        }

        Ok(Self(rgb))
    }
}

/// Backend that treats pixels close to a key colour as background
///
/// Confidence is `clamp((distance - tolerance) / softness, 0, 1)`; a zero
/// softness gives a hard step at `tolerance`.
#[derive(Debug, Clone)]
pub struct ChromaKeyBackend {
    key: KeyColor,
    tolerance: f32,
    softness: f32,
    initialized: bool,
}

impl ChromaKeyBackend {
    pub const DEFAULT_TOLERANCE: f32 = 0.25;
    pub const DEFAULT_SOFTNESS: f32 = 0.1;

    pub fn new(key: KeyColor, tolerance: f32, softness: f32) -> Result<Self> {
        let tolerance = NumericValidator::validate_unit_interval(tolerance, "tolerance")?;
        let softness = NumericValidator::validate_unit_interval(softness, "softness")?;
        Ok(Self {
            key,
            tolerance,
            softness,
            initialized: false,
        })
    }

    /// Default tolerance and softness for `key`
    #[must_use]
    pub fn with_key(key: KeyColor) -> Self {
        Self {
            key,
            tolerance: Self::DEFAULT_TOLERANCE,
            softness: Self::DEFAULT_SOFTNESS,
            initialized: false,
        }
    }

    #[must_use]
    pub fn key(&self) -> KeyColor {
        self.key
    }

    fn confidence(&self, rgb: &[f32]) -> f32 {
        let distance = self.key.distance(rgb);
        if self.softness == 0.0 {
            return if distance > self.tolerance { 1.0 } else { 0.0 };
        }
        ((distance - self.tolerance) / self.softness).clamp(0.0, 1.0)
    }
}

impl SegmentationBackend for ChromaKeyBackend {
    fn initialize(&mut self, _config: &ProcessorConfig) -> Result<Option<Duration>> {
        if !self.initialized {
            log::debug!(
                "Chroma key {:?}, tolerance {}, softness {}",
                self.key.0,
                self.tolerance,
                self.softness
            );
            self.initialized = true;
        }
        Ok(None)
    }

    fn infer(&mut self, image: &RasterImage) -> Result<ConfidenceGrid> {
        if !self.initialized {
            return Err(BgEraseError::inference("Chroma key backend not initialized"));
        }

        let rgb = image.convert(Channels::Rgb);
        let values = rgb
            .data()
            .chunks_exact(3)
            .map(|p| self.confidence(p))
            .collect();

        ConfidenceGrid::from_vec(image.width(), image.height(), values)
    }

    fn name(&self) -> &str {
        "chroma-key"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
