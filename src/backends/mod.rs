//! Segmentation backends
//!
//! Model-free backends usable without any inference runtime:
//! - Precomputed mask backend (mask exported by another tool)
//! - Chroma-key backend (green or blue screen footage)
//!
//! Model-based backends implement the same `SegmentationBackend` trait and are
//! injected by the host.

pub mod chroma_key;
pub mod mask_image;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

pub use self::chroma_key::{ChromaKeyBackend, KeyColor};
pub use self::mask_image::MaskImageBackend;
