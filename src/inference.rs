//! Segmentation backend abstraction

use crate::{config::ProcessorConfig, error::Result, types::ConfidenceGrid, types::RasterImage};

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// A model (or model stand-in) that scores every pixel for subject membership
///
/// Backends are owned by the host and injected into the processor; the
/// processor keeps the same instance for every image it segments.
pub trait SegmentationBackend: Send {
    /// Prepare the backend, returning how long loading took if it was measured
    ///
    /// # Errors
    /// - Backend-specific loading or validation failures
    fn initialize(&mut self, config: &ProcessorConfig) -> Result<Option<Duration>>;

    /// Score `image`, producing one confidence value per location
    ///
    /// The grid need not match the image size; the compositor resamples it.
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Inference failures
    fn infer(&mut self, image: &RasterImage) -> Result<ConfidenceGrid>;

    /// Interval the backend's confidences are expected to span
    fn value_range(&self) -> (f32, f32) {
        (0.0, 1.0)
    }

    /// Short identifier used in logs and result metadata
    fn name(&self) -> &str;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}
