//! Test utilities and mock backends
//!
//! A mock implementation of `SegmentationBackend` for exercising the
//! processor without real masks or key colours.

use crate::{
    config::ProcessorConfig,
    error::{BgEraseError, Result},
    inference::SegmentationBackend,
    types::{ConfidenceGrid, RasterImage},
};
use instant::Duration;
use std::sync::{Arc, Mutex};

/// Mock backend producing a soft circular subject centred in the image
#[derive(Debug, Clone)]
pub struct MockSegmentationBackend {
    /// Whether the backend has been initialized
    initialized: bool,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    /// Whether to simulate initialization failure
    should_fail_init: bool,
    /// Whether to simulate inference failure
    should_fail_inference: bool,
    /// Multiplier applied to every confidence value
    scale: f32,
}

impl MockSegmentationBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialized: false,
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail_init: false,
            should_fail_inference: false,
            scale: 1.0,
        }
    }

    /// Create a mock backend that will fail during initialization
    #[must_use]
    pub fn new_failing_init() -> Self {
        let mut backend = Self::new();
        backend.should_fail_init = true;
        backend
    }

    /// Create a mock backend that will fail during inference
    #[must_use]
    pub fn new_failing_inference() -> Self {
        let mut backend = Self::new();
        backend.should_fail_inference = true;
        backend
    }

    /// Create a mock backend whose output never reaches the cutout threshold
    #[must_use]
    pub fn new_empty_subject() -> Self {
        let mut backend = Self::new();
        backend.scale = 0.0;
        backend
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }

    fn generate_mock_grid(&self, width: u32, height: u32) -> Result<ConfidenceGrid> {
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius = (width.min(height) as f32 / 3.0).max(1.0);

        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 + 0.5 - center_x;
                let dy = y as f32 + 0.5 - center_y;
                let distance = (dx * dx + dy * dy).sqrt();
                let value = ((radius - distance) / radius * 2.0).clamp(0.0, 1.0);
                values.push(value * self.scale);
            }
        }

        ConfidenceGrid::from_vec(width, height, values)
    }
}

impl Default for MockSegmentationBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationBackend for MockSegmentationBackend {
    fn initialize(&mut self, _config: &ProcessorConfig) -> Result<Option<Duration>> {
        self.record_call("initialize");

        if self.should_fail_init {
            return Err(BgEraseError::inference("Mock backend initialization failed"));
        }

        self.initialized = true;
        Ok(Some(Duration::from_millis(5)))
    }

    fn infer(&mut self, image: &RasterImage) -> Result<ConfidenceGrid> {
        self.record_call("infer");

        if !self.initialized {
            return Err(BgEraseError::inference("Mock backend not initialized"));
        }

        if self.should_fail_inference {
            return Err(BgEraseError::inference("Mock backend inference failed"));
        }

        self.generate_mock_grid(image.width(), image.height())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
