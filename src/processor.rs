//! Segment-once, composite-many orchestration
//!
//! `BackgroundEraser` owns the injected segmentation backend and turns images
//! into [`SegmentedImage`]s. A segmented image can then be recomposited against
//! any number of backgrounds and blur settings without running the backend
//! again.

use crate::{
    assets::AssetStore,
    compositor::{desaturate_background, Compositor},
    config::ProcessorConfig,
    error::{BgEraseError, Result},
    extract::ForegroundExtractor,
    inference::SegmentationBackend,
    mask::MaskBuilder,
    types::{BlendParameters, CompositeMetadata, CompositeResult, ConfidenceGrid, RasterImage},
};
use instant::{Duration, Instant};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;
use tracing::{info as trace_info, instrument, span, Level};

/// Runs a segmentation backend and prepares masks for compositing
pub struct BackgroundEraser {
    config: ProcessorConfig,
    backend: Box<dyn SegmentationBackend>,
    cancellation: Option<CancellationToken>,
}

impl BackgroundEraser {
    /// Create an eraser around a host-constructed backend
    ///
    /// The backend is initialized lazily on the first [`segment`](Self::segment)
    /// call unless [`initialize`](Self::initialize) is called first.
    ///
    /// # Examples
    /// ```rust
    /// use bg_erase::{backends::ChromaKeyBackend, backends::KeyColor, BackgroundEraser, ProcessorConfig};
    ///
    /// let backend = ChromaKeyBackend::with_key(KeyColor::GREEN);
    /// let eraser = BackgroundEraser::with_backend(ProcessorConfig::default(), Box::new(backend)).unwrap();
    /// assert_eq!(eraser.backend_name(), "chroma-key");
    /// ```
    ///
    /// # Errors
    /// - Any error from [`ProcessorConfig::validate`]
    pub fn with_backend(
        config: ProcessorConfig,
        backend: Box<dyn SegmentationBackend>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            cancellation: None,
        })
    }

    /// Abort blurring in later composites once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Initialize the backend if it is not ready yet
    ///
    /// # Errors
    /// - `Inference` with the backend name when loading fails
    pub fn initialize(&mut self) -> Result<()> {
        if self.backend.is_initialized() {
            return Ok(());
        }

        let backend_name = self.backend.name().to_string();
        info!("Initializing segmentation backend '{}'", backend_name);

        let load_time = self
            .backend
            .initialize(&self.config)
            .map_err(|e| stage_error(&backend_name, "initialization", e))?;

        if let Some(duration) = load_time {
            debug!("Backend '{}' loaded in {}ms", backend_name, duration.as_millis());
        }
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run the backend on `image` and normalize its output into a mask
    ///
    /// # Errors
    /// - `EmptyImage` if `image` has zero area
    /// - `Inference` when the backend fails, tagged with its name
    /// - `InvalidRange` when the resolved mask range is empty or inverted
    #[instrument(
        skip(self, image),
        fields(
            backend = %self.backend.name(),
            width = image.width(),
            height = image.height()
        )
    )]
    pub fn segment(&mut self, image: &RasterImage) -> Result<SegmentedImage> {
        if image.is_empty() {
            return Err(BgEraseError::empty_image(format!(
                "cannot segment {}x{} image",
                image.width(),
                image.height()
            )));
        }

        self.initialize()?;
        let backend_name = self.backend.name().to_string();

        let inference_start = Instant::now();
        let grid = {
            let _span = span!(Level::INFO, "inference", backend = %backend_name).entered();
            self.backend
                .infer(image)
                .map_err(|e| stage_error(&backend_name, "inference", e))?
        };
        let inference_ms = elapsed_ms(inference_start.elapsed());

        let mask_start = Instant::now();
        let builder = self.mask_builder(&grid)?;
        let mask = {
            let _span = span!(
                Level::DEBUG,
                "mask_building",
                low = %builder.low(),
                high = %builder.high()
            )
            .entered();
            builder.build(&grid)?
        };
        let mask_ms = elapsed_ms(mask_start.elapsed());

        trace_info!(
            backend = %backend_name,
            inference_ms,
            mask_ms,
            "Segmentation complete"
        );

        Ok(SegmentedImage {
            image: image.clone(),
            mask,
            grid,
            mask_range: (builder.low(), builder.high()),
            backend_name,
            inference_ms,
            mask_ms,
            cutout_threshold: self.config.cutout_threshold,
            produce_cutout: self.config.produce_cutout,
            default_blend: self.config.blend.clone(),
            cancellation: self.cancellation.clone(),
        })
    }

    /// Segment `image` and composite it with the configured blend parameters
    ///
    /// # Errors
    /// - Any error from [`segment`](Self::segment) or [`SegmentedImage::composite`]
    pub fn process(&mut self, image: &RasterImage, store: &dyn AssetStore) -> Result<CompositeResult> {
        let segmented = self.segment(image)?;
        segmented.composite_default(store)
    }

    /// Auto range uses the grid itself; otherwise configured bounds override
    /// the backend's range one bound at a time.
    fn mask_builder(&self, grid: &ConfidenceGrid) -> Result<MaskBuilder> {
        if self.config.auto_range {
            return Ok(MaskBuilder::from_grid_range(grid));
        }
        let (low, high) = self.config.mask_range(self.backend.value_range());
        MaskBuilder::new(low, high)
    }
}

impl std::fmt::Debug for BackgroundEraser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundEraser")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("initialized", &self.backend.is_initialized())
            .finish()
    }
}

/// An image together with its normalized mask
///
/// Compositing never mutates a `SegmentedImage`, so one instance can be
/// shared across threads and recomposited concurrently.
#[derive(Debug, Clone)]
pub struct SegmentedImage {
    image: RasterImage,
    mask: RasterImage,
    grid: ConfidenceGrid,
    mask_range: (f32, f32),
    backend_name: String,
    inference_ms: u64,
    mask_ms: u64,
    cutout_threshold: f32,
    produce_cutout: bool,
    default_blend: BlendParameters,
    cancellation: Option<CancellationToken>,
}

impl SegmentedImage {
    /// The original foreground
    #[must_use]
    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    /// Single-channel mask at the backend's output resolution
    #[must_use]
    pub fn mask(&self) -> &RasterImage {
        &self.mask
    }

    /// Raw backend output the mask was built from
    #[must_use]
    pub fn grid(&self) -> &ConfidenceGrid {
        &self.grid
    }

    /// `(low, high)` interval used to normalize the grid
    #[must_use]
    pub fn mask_range(&self) -> (f32, f32) {
        self.mask_range
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    #[must_use]
    pub fn inference_ms(&self) -> u64 {
        self.inference_ms
    }

    #[must_use]
    pub fn mask_ms(&self) -> u64 {
        self.mask_ms
    }

    /// Blend parameters taken from the processor configuration
    #[must_use]
    pub fn default_blend(&self) -> &BlendParameters {
        &self.default_blend
    }

    /// Composite using the configured default blend parameters
    ///
    /// # Errors
    /// - See [`composite`](Self::composite)
    pub fn composite_default(&self, store: &dyn AssetStore) -> Result<CompositeResult> {
        self.composite(store, &self.default_blend)
    }

    /// Composite the foreground over the background named in `params`
    ///
    /// When the cutout is enabled it is extracted on a scoped thread while
    /// the blend runs. An empty subject leaves `cutout` as `None` instead of
    /// failing the composite.
    ///
    /// # Errors
    /// - `InvalidParameter` for bad sigmas or an empty background id
    /// - `AssetNotFound` if the store cannot resolve the background
    /// - `Cancelled` if the cancellation token fires during blurring
    #[instrument(
        level = "info",
        skip_all,
        fields(
            backend = %self.backend_name,
            background = %params.background_id,
            sigma_main = params.sigma_main,
            sigma_background = params.sigma_background
        )
    )]
    pub fn composite(
        &self,
        store: &dyn AssetStore,
        params: &BlendParameters,
    ) -> Result<CompositeResult> {
        let start = Instant::now();
        params.validate()?;
        let background = store.load(&params.background_id)?;
        let compositor = self.compositor();

        let (blended, composite_elapsed, cutout) = std::thread::scope(|scope| {
            let threshold = self.cutout_threshold;
            let cutout_handle = self.produce_cutout.then(|| {
                scope.spawn(move || {
                    let _span = span!(Level::DEBUG, "cutout", threshold = %threshold).entered();
                    let cutout_start = Instant::now();
                    let cutout = ForegroundExtractor::new(threshold)
                        .and_then(|extractor| extractor.extract(&self.image, &self.mask));
                    (cutout, cutout_start.elapsed())
                })
            });

            let blend_start = Instant::now();
            let blended = compositor.composite(
                &self.image,
                &self.mask,
                &background,
                params.sigma_main,
                params.sigma_background,
            );
            let composite_elapsed = blend_start.elapsed();

            let cutout = cutout_handle.map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            });
            (blended, composite_elapsed, cutout)
        });

        let image = blended?;
        let (cutout, cutout_ms) = match cutout {
            Some((Ok(cutout), elapsed)) => (Some(cutout), Some(elapsed_ms(elapsed))),
            Some((Err(BgEraseError::NoSubjectDetected(reason)), elapsed)) => {
                warn!("Skipping cutout: {}", reason);
                (None, Some(elapsed_ms(elapsed)))
            },
            Some((Err(e), _)) => return Err(e),
            None => (None, None),
        };

        let mut metadata = CompositeMetadata::new(self.backend_name.clone(), params, image.dimensions());
        metadata.timings.inference_ms = self.inference_ms;
        metadata.timings.mask_ms = self.mask_ms;
        metadata.timings.composite_ms = elapsed_ms(composite_elapsed);
        metadata.timings.cutout_ms = cutout_ms;
        metadata.timings.total_ms = self.inference_ms + self.mask_ms + elapsed_ms(start.elapsed());

        let result = CompositeResult::new(image, cutout, metadata);
        debug!("Composite against '{}': {}", params.background_id, result.timing_summary());
        Ok(result)
    }

    /// Hard-edged cutout at the configured threshold
    ///
    /// Unlike [`composite`](Self::composite), an empty subject is an error
    /// here.
    ///
    /// # Errors
    /// - `NoSubjectDetected` if no mask sample reaches the threshold
    pub fn cutout(&self) -> Result<RasterImage> {
        ForegroundExtractor::new(self.cutout_threshold)?.extract(&self.image, &self.mask)
    }

    /// Foreground with a grey background, subject kept in colour
    ///
    /// # Errors
    /// - See [`desaturate_background`]
    pub fn desaturated(&self) -> Result<RasterImage> {
        desaturate_background(&self.image, &self.mask)
    }

    fn compositor(&self) -> Compositor {
        match &self.cancellation {
            Some(token) => Compositor::default().with_cancellation(token.clone()),
            None => Compositor::default(),
        }
    }
}

/// Tag backend `Inference` failures with the backend name and stage
fn stage_error(backend: &str, stage: &str, error: BgEraseError) -> BgEraseError {
    match error {
        BgEraseError::Inference(details) => BgEraseError::inference_stage_error(backend, stage, &details),
        other => other,
    }
}

fn elapsed_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
