//! Error types for mask building and compositing operations

use thiserror::Error;

/// Result type alias for background replacement operations
pub type Result<T> = std::result::Result<T, BgEraseError>;

/// Error taxonomy for the compositing pipeline
#[derive(Error, Debug)]
pub enum BgEraseError {
    /// Mask normalization range is empty or inverted
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Requested raster dimensions are unusable
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// A numeric parameter (sigma, threshold, percentage) is out of bounds
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An input image or grid has zero area
    #[error("Empty image: {0}")]
    EmptyImage(String),

    /// A background identifier could not be resolved by the asset store
    #[error("Background asset not found: {0}")]
    AssetNotFound(String),

    /// The hard mask selects no pixels at all
    #[error("No subject detected: {0}")]
    NoSubjectDetected(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Errors reported by a segmentation backend
    #[error("Inference error: {0}")]
    Inference(String),

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cancellable operation observed its cancellation token
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl BgEraseError {
    /// Create a new invalid range error
    pub fn invalid_range<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRange(msg.into())
    }

    /// Create a new invalid dimensions error
    pub fn invalid_dimensions<S: Into<String>>(msg: S) -> Self {
        Self::InvalidDimensions(msg.into())
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new empty image error
    pub fn empty_image<S: Into<String>>(msg: S) -> Self {
        Self::EmptyImage(msg.into())
    }

    /// Create a new asset not found error
    pub fn asset_not_found<S: Into<String>>(id: S) -> Self {
        Self::AssetNotFound(id.into())
    }

    /// Create a new no subject detected error
    pub fn no_subject<S: Into<String>>(msg: S) -> Self {
        Self::NoSubjectDetected(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new cancellation error
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create file I/O error with operation and path context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create image loading error with path context
    pub fn image_load_error<P: AsRef<std::path::Path>>(path: P, error: image::ImageError) -> Self {
        let path_display = path.as_ref().display();
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        Self::Image(image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Failed to load image '{}' (format: {}): {}. Supported formats: PNG, JPEG, WebP, TIFF",
                path_display, extension, error
            ),
        )))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Wrap a backend failure with the backend name and stage
    pub fn inference_stage_error(backend: &str, stage: &str, details: &str) -> Self {
        Self::Inference(format!(
            "Backend '{}' failed during {}: {}",
            backend, stage, details
        ))
    }
}
