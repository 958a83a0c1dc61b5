//! Separable Gaussian blur
//!
//! Boundary policy: half-sample symmetric reflection. Samples that fall
//! outside the image mirror back across the border (`-1 -> 0`, `-2 -> 1`,
//! `n -> n - 1`), repeating with period `2 * n` when the kernel is wider than
//! the image. A uniform image stays uniform, borders do not darken, and blur
//! variance never rises with sigma. The kernel radius is `ceil(3 * sigma)`.

use crate::{
    error::{BgEraseError, Result},
    types::RasterImage,
    utils::NumericValidator,
};
use tokio_util::sync::CancellationToken;
use tracing::{span, trace, Level};

/// Blur every channel of `image` with a Gaussian of standard deviation `sigma`
///
/// `sigma == 0` returns an identical copy.
///
/// # Errors
/// - `InvalidParameter` if `sigma` is negative, not finite, or above
///   [`MAX_SIGMA`](crate::utils::MAX_SIGMA) (1024)
pub fn gaussian_blur(image: &RasterImage, sigma: f32) -> Result<RasterImage> {
    blur(image, sigma, None)
}

/// Like [`gaussian_blur`], but checks `token` between scanlines
///
/// # Errors
/// - `InvalidParameter` for a bad `sigma`
/// - `Cancelled` once the token has been cancelled
pub fn gaussian_blur_cancellable(
    image: &RasterImage,
    sigma: f32,
    token: &CancellationToken,
) -> Result<RasterImage> {
    blur(image, sigma, Some(token))
}

/// Normalized 1-D Gaussian kernel of length `2 * ceil(3 * sigma) + 1`
///
/// `sigma == 0` yields the single-tap identity kernel `[1.0]`.
pub fn gaussian_kernel(sigma: f32) -> Result<Vec<f32>> {
    let sigma = NumericValidator::validate_sigma(sigma)?;
    if sigma == 0.0 {
        return Ok(vec![1.0]);
    }

    let radius = kernel_radius(sigma);
    // f64 keeps tiny sigmas from underflowing to 0/0
    let two_sigma_sq = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-(d * d) / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();

    Ok(weights.into_iter().map(|w| (w / sum) as f32).collect())
}

fn kernel_radius(sigma: f32) -> usize {
    (3.0 * sigma).ceil() as usize
}

fn blur(image: &RasterImage, sigma: f32, token: Option<&CancellationToken>) -> Result<RasterImage> {
    let kernel = gaussian_kernel(sigma)?;
    if kernel.len() == 1 || image.is_empty() {
        return Ok(image.clone());
    }

    let _span = span!(
        Level::TRACE,
        "gaussian_blur",
        sigma = %sigma,
        width = image.width(),
        height = image.height()
    )
    .entered();

    let width = image.width() as usize;
    let height = image.height() as usize;
    let stride = image.channels().count();
    let radius = kernel.len() / 2;

    let horizontal = convolve(image.data(), &kernel, token, Pass {
        lines: height,
        length: width,
        radius,
        stride,
        row_major: true,
        row_width: width,
    })?;
    let vertical = convolve(&horizontal, &kernel, token, Pass {
        lines: width,
        length: height,
        radius,
        stride,
        row_major: false,
        row_width: width,
    })?;

    trace!(radius, "blur complete");
    RasterImage::new(image.width(), image.height(), image.channels(), vertical)
}

/// Geometry of one 1-D convolution pass over the image
struct Pass {
    /// Number of independent lines (rows or columns)
    lines: usize,
    /// Pixels per line
    length: usize,
    radius: usize,
    stride: usize,
    /// Lines are rows when true, columns otherwise
    row_major: bool,
    row_width: usize,
}

impl Pass {
    fn offset(&self, line: usize, position: usize) -> usize {
        let (x, y) = if self.row_major {
            (position, line)
        } else {
            (line, position)
        };
        (y * self.row_width + x) * self.stride
    }
}

fn convolve(
    src: &[f32],
    kernel: &[f32],
    token: Option<&CancellationToken>,
    pass: Pass,
) -> Result<Vec<f32>> {
    let mut dst = vec![0.0; src.len()];

    for line in 0..pass.lines {
        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(BgEraseError::cancelled(format!(
                "blur interrupted at line {} of {}",
                line, pass.lines
            )));
        }

        for position in 0..pass.length {
            let out = pass.offset(line, position);
            for channel in 0..pass.stride {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let offset = position as isize + k as isize - pass.radius as isize;
                    let tap = reflect(offset, pass.length);
                    acc += weight * src.get(pass.offset(line, tap) + channel).copied().unwrap_or(0.0);
                }
                if let Some(sample) = dst.get_mut(out + channel) {
                    *sample = acc;
                }
            }
        }
    }

    Ok(dst)
}

/// Half-sample symmetric index into a line of `length` samples
fn reflect(index: isize, length: usize) -> usize {
    let period = 2 * length as isize;
    let folded = index.rem_euclid(period) as usize;
    if folded < length {
        folded
    } else {
        2 * length - 1 - folded
    }
}
