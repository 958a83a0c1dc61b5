//! Numeric validation utilities
//!
//! Range checks shared by the mask, resampling, blur and extraction stages.

use crate::error::{BgEraseError, Result};

/// Upper bound on blur sigma; larger values give kernels wider than any sane image
pub const MAX_SIGMA: f32 = 1024.0;

/// Validator for numeric parameters
pub struct NumericValidator;

impl NumericValidator {
    /// Reject NaN and infinities
    pub fn validate_finite(value: f32, name: &str) -> Result<f32> {
        if !value.is_finite() {
            return Err(BgEraseError::invalid_parameter(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate a Gaussian sigma (finite, non-negative, bounded)
    pub fn validate_sigma(sigma: f32) -> Result<f32> {
        Self::validate_finite(sigma, "sigma")?;

        if sigma < 0.0 {
            return Err(BgEraseError::invalid_parameter(format!(
                "sigma must be non-negative, got {}",
                sigma
            )));
        }

        if sigma > MAX_SIGMA {
            return Err(BgEraseError::invalid_parameter(format!(
                "sigma {} exceeds maximum allowed ({})",
                sigma, MAX_SIGMA
            )));
        }

        Ok(sigma)
    }

    /// Validate target raster dimensions (both at least 1)
    pub fn validate_dimensions(width: u32, height: u32) -> Result<(u32, u32)> {
        if width == 0 || height == 0 {
            return Err(BgEraseError::invalid_dimensions(format!(
                "target size must be at least 1x1, got {}x{}",
                width, height
            )));
        }

        if u64::from(width) * u64::from(height) > usize::MAX as u64 / 4 {
            return Err(BgEraseError::invalid_dimensions(format!(
                "target size {}x{} is too large to allocate",
                width, height
            )));
        }

        Ok((width, height))
    }

    /// Validate a value in the closed unit interval
    pub fn validate_unit_interval(value: f32, name: &str) -> Result<f32> {
        Self::validate_finite(value, name)?;

        if !(0.0..=1.0).contains(&value) {
            return Err(BgEraseError::invalid_parameter(format!(
                "{} must be between 0.0 and 1.0, got {}",
                name, value
            )));
        }

        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(BgEraseError::invalid_parameter(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }

    /// Validate a normalization interval where `high` must exceed `low`
    pub fn validate_interval(low: f32, high: f32) -> Result<(f32, f32)> {
        if !low.is_finite() || !high.is_finite() {
            return Err(BgEraseError::invalid_range(format!(
                "range bounds must be finite, got [{}, {}]",
                low, high
            )));
        }

        if high <= low {
            return Err(BgEraseError::invalid_range(format!(
                "high ({}) must be greater than low ({})",
                high, low
            )));
        }

        Ok((low, high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigma_validation() {
        assert!(NumericValidator::validate_sigma(0.0).is_ok());
        assert!(NumericValidator::validate_sigma(20.0).is_ok());
        assert!(NumericValidator::validate_sigma(-0.5).is_err());
        assert!(NumericValidator::validate_sigma(f32::NAN).is_err());
        assert!(NumericValidator::validate_sigma(f32::INFINITY).is_err());
        assert!(NumericValidator::validate_sigma(MAX_SIGMA + 1.0).is_err());
    }

    #[test]
    fn test_dimension_validation() {
        assert_eq!(NumericValidator::validate_dimensions(1, 1).unwrap(), (1, 1));
        assert!(matches!(
            NumericValidator::validate_dimensions(0, 10),
            Err(BgEraseError::InvalidDimensions(_))
        ));
        assert!(matches!(
            NumericValidator::validate_dimensions(10, 0),
            Err(BgEraseError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_unit_interval() {
        assert!(NumericValidator::validate_unit_interval(0.0, "t").is_ok());
        assert!(NumericValidator::validate_unit_interval(1.0, "t").is_ok());
        assert!(NumericValidator::validate_unit_interval(1.01, "t").is_err());
        assert!(NumericValidator::validate_unit_interval(-0.01, "t").is_err());
    }

    #[test]
    fn test_interval_validation() {
        assert!(NumericValidator::validate_interval(0.0, 1.0).is_ok());
        assert!(matches!(
            NumericValidator::validate_interval(1.0, 1.0),
            Err(BgEraseError::InvalidRange(_))
        ));
        assert!(matches!(
            NumericValidator::validate_interval(2.0, 1.0),
            Err(BgEraseError::InvalidRange(_))
        ));
        assert!(NumericValidator::validate_interval(f32::NEG_INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_range_validation() {
        assert_eq!(
            NumericValidator::validate_range(50u8, 0, 100, "quality").unwrap(),
            50
        );
        let err = NumericValidator::validate_range(150u8, 0, 100, "quality").unwrap_err();
        assert!(err.to_string().contains("quality"));
    }
}
