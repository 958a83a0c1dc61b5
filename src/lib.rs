#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # bg-erase
//!
//! Mask-driven background replacement. A segmentation backend scores every
//! pixel of a photo; the scores become an alpha mask, and the mask drives a
//! blend of the photo over a replacement background with independently
//! tunable blur on the mask edge and on the background.
//!
//! ## Pipeline
//!
//! 1. [`SegmentationBackend::infer`] produces a [`ConfidenceGrid`]
//! 2. [`build_mask`] normalizes it into a single-channel mask
//! 3. [`resize`] brings mask and background to the photo's size
//! 4. [`gaussian_blur`] softens the mask (`sigma_main`) and the background
//!    (`sigma_background`)
//! 5. [`composite`] blends `m * fg + (1 - m) * bg`
//!
//! [`extract_foreground`] produces a hard-edged transparent cutout from the
//! same mask.
//!
//! ## Quick Start
//!
//! ```rust
//! use bg_erase::{composite, Channels, RasterImage};
//!
//! let photo = RasterImage::solid(64, 48, Channels::Rgb, &[0.9, 0.6, 0.5])?;
//! let background = RasterImage::solid(16, 16, Channels::Rgb, &[0.1, 0.3, 0.8])?;
//! let mask = RasterImage::from_fn(8, 6, Channels::Luma, |x, _, p| {
//!     p[0] = if x < 4 { 1.0 } else { 0.0 };
//! })?;
//!
//! let blended = composite(&photo, &mask, &background, 2.0, 1.0)?;
//! assert_eq!(blended.dimensions(), (64, 48));
//! # Ok::<(), bg_erase::BgEraseError>(())
//! ```
//!
//! ## Segment once, composite many times
//!
//! ```rust
//! use bg_erase::{
//!     backends::{ChromaKeyBackend, KeyColor},
//!     BackgroundEraser, BlendParameters, Channels, InMemoryAssetStore, ProcessorConfig,
//!     RasterImage,
//! };
//!
//! let photo = RasterImage::from_fn(32, 32, Channels::Rgb, |x, _, p| {
//!     p.copy_from_slice(if x < 16 { &[0.0, 1.0, 0.0] } else { &[0.8, 0.2, 0.2] });
//! })?;
//! let store = InMemoryAssetStore::with_plain_backgrounds(32, 32)?;
//!
//! let backend = ChromaKeyBackend::with_key(KeyColor::GREEN);
//! let mut eraser = BackgroundEraser::with_backend(ProcessorConfig::default(), Box::new(backend))?;
//! let segmented = eraser.segment(&photo)?;
//!
//! let white = segmented.composite(&store, &BlendParameters::new("transparent_white"))?;
//! let black = segmented.composite(&store, &BlendParameters::new("transparent_black").with_sigma_main(0.0))?;
//! assert!(white.image.mean() > black.image.mean());
//! # Ok::<(), bg_erase::BgEraseError>(())
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): the `bg-erase` binary and tracing subscriber setup
//! - `webp-support` (default): WebP decoding and encoding
//! - `tracing-json`: JSON log output for the CLI

pub mod assets;
pub mod backends;
pub mod blur;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod extract;
pub mod inference;
pub mod mask;
pub mod processor;
pub mod resample;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use assets::{AssetStore, DirectoryAssetStore, InMemoryAssetStore, DEFAULT_BACKGROUND_IDS};
pub use blur::{gaussian_blur, gaussian_blur_cancellable, gaussian_kernel};
pub use compositor::{composite, composite_with, desaturate_background, Compositor};
pub use config::{OutputFormat, ProcessorConfig, ProcessorConfigBuilder};
pub use error::{BgEraseError, Result};
pub use extract::{extract_foreground, ForegroundExtractor};
pub use inference::SegmentationBackend;
pub use mask::{build_mask, mask_statistics, MaskBuilder, MaskStatistics};
pub use processor::{BackgroundEraser, SegmentedImage};
pub use resample::{resize, resize_by_percentage, resize_to_width, ImageResampler, ResampleFilter};
pub use services::{ImageIOService, OutputFormatHandler};
pub use types::{
    BlendParameters, Channels, CompositeMetadata, CompositeResult, ConfidenceGrid,
    ProcessingTimings, RasterImage,
};
pub use utils::NumericValidator;

#[cfg(feature = "cli")]
pub use tracing_config::{events, init_cli_tracing, spans, TracingConfig, TracingFormat};
