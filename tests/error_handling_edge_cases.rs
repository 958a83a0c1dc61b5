//! Error handling and edge case testing
//!
//! Boundary conditions across the pipeline: degenerate ranges, empty inputs,
//! bad sigmas, unusual channel layouts and cancellation.

use bg_erase::{
    backends::MaskImageBackend,
    blur::gaussian_blur_cancellable,
    build_mask, composite, composite_with,
    error::Result,
    gaussian_blur, gaussian_kernel, resize, resize_by_percentage, resize_to_width, BackgroundEraser,
    BgEraseError, BlendParameters, Channels, Compositor, ConfidenceGrid, ForegroundExtractor,
    InMemoryAssetStore, MaskBuilder, ProcessorConfig, RasterImage,
};
use tokio_util::sync::CancellationToken;

fn rgb(width: u32, height: u32, value: f32) -> RasterImage {
    RasterImage::solid(width, height, Channels::Rgb, &[value; 3]).unwrap()
}

fn empty() -> RasterImage {
    RasterImage::new(0, 0, Channels::Rgb, vec![]).unwrap()
}

#[test]
fn test_mask_range_edge_cases() -> Result<()> {
    let grid = ConfidenceGrid::from_vec(2, 1, vec![0.0, 1.0])?;

    assert!(matches!(build_mask(&grid, 1.0, 0.0), Err(BgEraseError::InvalidRange(_))));
    assert!(matches!(build_mask(&grid, 0.0, f32::NAN), Err(BgEraseError::InvalidRange(_))));
    assert!(matches!(
        build_mask(&grid, f32::NEG_INFINITY, 1.0),
        Err(BgEraseError::InvalidRange(_))
    ));

    // A tiny but valid interval is fine
    let mask = build_mask(&grid, 0.5, 0.500_1)?;
    assert_eq!(mask.data(), &[0.0, 1.0]);

    // Negative intervals work like any other
    let grid = ConfidenceGrid::from_vec(3, 1, vec![-10.0, -5.0, 0.0])?;
    assert_eq!(MaskBuilder::new(-10.0, 0.0)?.build(&grid)?.data(), &[0.0, 0.5, 1.0]);
    Ok(())
}

#[test]
fn test_all_zero_inputs_are_valid() -> Result<()> {
    let grid = ConfidenceGrid::from_vec(4, 4, vec![0.0; 16])?;
    let mask = build_mask(&grid, 0.0, 1.0)?;

    let output = composite(&rgb(8, 8, 0.7), &mask, &rgb(8, 8, 0.2), 0.0, 0.0)?;
    assert!(output.data().iter().all(|&v| (v - 0.2).abs() < 1e-6));
    Ok(())
}

#[test]
fn test_empty_inputs_are_rejected() {
    let mask = RasterImage::solid(2, 2, Channels::Luma, &[1.0]).unwrap();

    assert!(matches!(
        composite(&empty(), &mask, &rgb(2, 2, 0.0), 1.0, 1.0),
        Err(BgEraseError::EmptyImage(_))
    ));
    assert!(matches!(
        composite(&rgb(2, 2, 0.0), &empty(), &rgb(2, 2, 0.0), 1.0, 1.0),
        Err(BgEraseError::EmptyImage(_))
    ));
    assert!(matches!(
        composite(&rgb(2, 2, 0.0), &mask, &empty(), 1.0, 1.0),
        Err(BgEraseError::EmptyImage(_))
    ));
    assert!(matches!(resize(&empty(), 4, 4), Err(BgEraseError::EmptyImage(_))));
    assert!(matches!(
        ForegroundExtractor::default().extract(&empty(), &mask),
        Err(BgEraseError::EmptyImage(_))
    ));
}

#[test]
fn test_sigma_edge_cases() -> Result<()> {
    let image = rgb(6, 6, 0.5);

    for bad in [-0.001, f32::NAN, f32::INFINITY] {
        assert!(matches!(gaussian_blur(&image, bad), Err(BgEraseError::InvalidParameter(_))));
        assert!(gaussian_kernel(bad).is_err());
    }

    // Sigma far larger than the image still reflects cleanly off the edges
    let blurred = gaussian_blur(&image, 50.0)?;
    assert!(blurred.data().iter().all(|&v| (v - 0.5).abs() < 1e-4));

    // Very small sigma is nearly the identity
    let checker = RasterImage::from_fn(4, 4, Channels::Luma, |x, y, p| {
        p[0] = ((x + y) % 2) as f32;
    })?;
    let sharp = gaussian_blur(&checker, 0.01)?;
    assert!(sharp.max_abs_difference(&checker).unwrap() < 1e-4);

    let mask = RasterImage::solid(2, 2, Channels::Luma, &[1.0])?;
    assert!(matches!(
        composite(&image, &mask, &image, -1.0, 0.0),
        Err(BgEraseError::InvalidParameter(_))
    ));
    Ok(())
}

#[test]
fn test_single_pixel_images() -> Result<()> {
    let fg = rgb(1, 1, 1.0);
    let bg = rgb(1, 1, 0.0);
    let mask = RasterImage::solid(1, 1, Channels::Luma, &[0.25])?;

    let output = composite(&fg, &mask, &bg, 10.0, 10.0)?;
    let value = output.pixel(0, 0).unwrap()[0];
    assert!((value - 0.25).abs() < 1e-5);
    Ok(())
}

#[test]
fn test_mixed_channel_layouts() -> Result<()> {
    let fg = RasterImage::solid(8, 8, Channels::Rgba, &[1.0, 0.0, 0.0, 1.0])?;
    let grey_bg = RasterImage::solid(4, 4, Channels::Luma, &[0.5])?;
    let colour_mask = RasterImage::solid(8, 8, Channels::Rgb, &[0.0, 0.0, 0.0])?;

    let output = composite(&fg, &colour_mask, &grey_bg, 0.0, 0.0)?;
    assert_eq!(output.channels(), Channels::Rgba);
    let pixel = output.pixel(3, 3).unwrap();
    for (actual, expected) in pixel.iter().zip([0.5, 0.5, 0.5, 1.0]) {
        assert!((actual - expected).abs() < 1e-5);
    }

    let grey_fg = RasterImage::solid(4, 4, Channels::LumaAlpha, &[0.2, 1.0])?;
    let output = composite(&grey_fg, &colour_mask, &rgb(4, 4, 1.0), 0.0, 0.0)?;
    assert_eq!(output.channels(), Channels::LumaAlpha);
    Ok(())
}

#[test]
fn test_out_of_range_mask_samples_are_clamped() -> Result<()> {
    let mask = RasterImage::new(2, 1, Channels::Luma, vec![-0.5, 1.5])?;
    let output = composite(&rgb(2, 1, 1.0), &mask, &rgb(2, 1, 0.0), 0.0, 0.0)?;
    assert_eq!(output.data(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    Ok(())
}

#[test]
fn test_resize_helpers_edge_cases() -> Result<()> {
    let image = rgb(100, 50, 0.5);

    assert_eq!(resize_by_percentage(&image, 0.99)?.dimensions(), (99, 50));
    assert_eq!(resize_by_percentage(&image, 0.001)?.dimensions(), (1, 1));
    assert!(resize_by_percentage(&image, 0.0).is_err());
    assert!(resize_by_percentage(&image, f32::NAN).is_err());

    assert_eq!(resize_to_width(&image, 1200)?.dimensions(), (1200, 600));
    assert!(matches!(resize_to_width(&image, 0), Err(BgEraseError::InvalidDimensions(_))));
    Ok(())
}

#[test]
fn test_blend_parameter_validation_through_store() -> Result<()> {
    let store = InMemoryAssetStore::with_plain_backgrounds(4, 4)?;
    let fg = rgb(4, 4, 0.3);
    let mask = RasterImage::solid(4, 4, Channels::Luma, &[1.0])?;

    let empty_id = BlendParameters::new("");
    assert!(matches!(
        composite_with(&fg, &mask, &empty_id, &store),
        Err(BgEraseError::InvalidParameter(_))
    ));

    let bad_sigma = BlendParameters::new("transparent_white").with_sigma_background(-3.0);
    assert!(matches!(
        composite_with(&fg, &mask, &bad_sigma, &store),
        Err(BgEraseError::InvalidParameter(_))
    ));
    Ok(())
}

#[test]
fn test_extractor_threshold_bounds() -> Result<()> {
    assert!(matches!(ForegroundExtractor::new(1.5), Err(BgEraseError::InvalidParameter(_))));
    assert!(ForegroundExtractor::new(f32::NAN).is_err());

    // Threshold 0 keeps everything, even an all-zero mask
    let image = rgb(3, 3, 0.4);
    let mask = RasterImage::solid(3, 3, Channels::Luma, &[0.0])?;
    let cutout = ForegroundExtractor::new(0.0)?.extract(&image, &mask)?;
    assert!(cutout.data().chunks_exact(4).all(|p| p[3] == 1.0));
    Ok(())
}

#[test]
fn test_cancellation() -> Result<()> {
    let token = CancellationToken::new();
    token.cancel();

    let image = rgb(16, 16, 0.5);
    assert!(matches!(
        gaussian_blur_cancellable(&image, 2.0, &token),
        Err(BgEraseError::Cancelled(_))
    ));

    let mask = RasterImage::solid(16, 16, Channels::Luma, &[1.0])?;
    let compositor = Compositor::default().with_cancellation(token);
    assert!(matches!(
        compositor.composite(&image, &mask, &image, 3.0, 0.0),
        Err(BgEraseError::Cancelled(_))
    ));
    Ok(())
}

#[test]
fn test_missing_mask_file_fails_initialization() {
    let backend = MaskImageBackend::from_path("/nonexistent/mask.png");
    let mut eraser =
        BackgroundEraser::with_backend(ProcessorConfig::default(), Box::new(backend)).unwrap();

    let result = eraser.segment(&rgb(4, 4, 0.5));
    assert!(matches!(result, Err(BgEraseError::Image(_))));
    assert!(!eraser.is_initialized());
}
