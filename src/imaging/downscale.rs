//! Ratio-preserving downscaling.
//!
//! Three entry points share one policy:
//!
//! | Entry point | Source | Returns |
//! |---|---|---|
//! | [`scale_to_fit`] | decoded [`DynamicImage`] | `Cow`, borrowed when no resize was needed |
//! | [`scale_to_fit_from_memory`] | encoded bytes | owned image |
//! | [`scale_to_fit_from_path`] | file on disk | owned image, two-stage decode |
//!
//! None of them ever upscales. The on-disk path reads only the header first,
//! picks a power-of-two subsample factor that stays one step above the
//! target, decodes at that reduced size, and finishes with a Lanczos3
//! resize. When the factor is above 1 the full-resolution buffer never
//! exists: JPEG is scaled inside the decoder and PNG is block-averaged row by
//! row (see `reduced`). Other formats, and interlaced PNG, fail with
//! [`ScaleError::Unsupported`] in that case. A factor of 1 means the source
//! is already within twice the target, so it is decoded whole under the
//! [`DecodeLimits`] ceiling.

use super::calculations::{
    calculate_fit_dimensions, calculate_sample_factor, fits_within, oriented_bounds,
};
use super::params::{Bounds, DecodeLimits};
use super::reduced::{decode_jpeg_scaled, decode_png_subsampled};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ScaleError {
    #[error("Unreadable image: {0}")]
    Unreadable(String),
    #[error("Not enough memory to process image: {0}")]
    ResourceExhausted(String),
    #[error("Bounds must be non-zero, got {}x{}", .0.width, .0.height)]
    InvalidBounds(Bounds),
    #[error("Reduced-size decoding not supported: {0}")]
    Unsupported(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

fn map_image_error(err: ImageError) -> ScaleError {
    match err {
        ImageError::Limits(_) => ScaleError::ResourceExhausted(err.to_string()),
        other => ScaleError::Unreadable(other.to_string()),
    }
}

pub(super) fn unreadable(path: &Path, err: impl std::fmt::Display) -> ScaleError {
    ScaleError::Unreadable(format!("{}: {}", path.display(), err))
}

fn check_bounds(bounds: Bounds) -> Result<(), ScaleError> {
    if bounds.is_empty() {
        return Err(ScaleError::InvalidBounds(bounds));
    }
    Ok(())
}

fn checked_dimensions(image: &DynamicImage) -> Result<(u32, u32), ScaleError> {
    let dims = (image.width(), image.height());
    if dims.0 == 0 || dims.1 == 0 {
        return Err(ScaleError::Unreadable("image has no pixels".into()));
    }
    Ok(dims)
}

fn resize_to_fit(image: &DynamicImage, source: (u32, u32), bounds: Bounds) -> DynamicImage {
    let (width, height) = calculate_fit_dimensions(source, bounds);
    debug!(
        from_width = source.0,
        from_height = source.1,
        width,
        height,
        "scaling image down"
    );
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Owned variant of the fit step for buffers this module decoded itself.
fn fit_owned(image: DynamicImage, bounds: Bounds) -> Result<DynamicImage, ScaleError> {
    let source = checked_dimensions(&image)?;
    if fits_within(source, bounds) {
        debug!(width = source.0, height = source.1, "image already small enough");
        return Ok(image);
    }
    Ok(resize_to_fit(&image, source, bounds))
}

/// Shrink an image to the largest size that fits `bounds` without
/// distorting its aspect ratio.
///
/// With `reversible`, a box whose orientation disagrees with the image is
/// turned around first (800x600 accepts a 600x800 portrait as-is). An image
/// that already fits comes back borrowed; call `into_owned()` if a distinct
/// copy is required.
pub fn scale_to_fit(
    image: &DynamicImage,
    bounds: Bounds,
    reversible: bool,
) -> Result<Cow<'_, DynamicImage>, ScaleError> {
    check_bounds(bounds)?;
    let source = checked_dimensions(image)?;
    let bounds = oriented_bounds(bounds, source, reversible);

    if fits_within(source, bounds) {
        debug!(width = source.0, height = source.1, "image already small enough");
        return Ok(Cow::Borrowed(image));
    }
    Ok(Cow::Owned(resize_to_fit(image, source, bounds)))
}

/// Decode encoded image bytes and scale them to fit `bounds`.
pub fn scale_to_fit_from_memory(
    bytes: &[u8],
    bounds: Bounds,
    reversible: bool,
    limits: DecodeLimits,
) -> Result<DynamicImage, ScaleError> {
    check_bounds(bounds)?;
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ScaleError::Unreadable(e.to_string()))?;
    reader.limits(limits.to_image_limits());
    let image = reader.decode().map_err(map_image_error)?;

    let source = checked_dimensions(&image)?;
    fit_owned(image, oriented_bounds(bounds, source, reversible))
}

/// Decode a file from disk and scale it to fit `bounds`, bounding peak
/// memory with a coarse power-of-two subsample before the final resize.
pub fn scale_to_fit_from_path(
    path: &Path,
    bounds: Bounds,
    reversible: bool,
    limits: DecodeLimits,
) -> Result<DynamicImage, ScaleError> {
    check_bounds(bounds)?;
    let (format, source) = probe(path)?;
    let bounds = oriented_bounds(bounds, source, reversible);
    let factor = calculate_sample_factor(source, bounds);

    debug!(
        path = %path.display(),
        width = source.0,
        height = source.1,
        factor,
        "subsampling before resize"
    );

    let decoded = match format {
        _ if factor == 1 => decode_whole(path, limits)?,
        Some(ImageFormat::Jpeg) => decode_jpeg_scaled(path, source, factor, limits)?,
        Some(ImageFormat::Png) => decode_png_subsampled(path, factor, limits)?,
        other => {
            let name = other
                .and_then(|f| f.extensions_str().first().copied())
                .unwrap_or("unknown format");
            return Err(ScaleError::Unsupported(format!(
                "{}: {name} needs a 1/{factor} decode",
                path.display()
            )));
        }
    };

    // Orientation was settled against the original dimensions above.
    fit_owned(decoded, bounds)
}

/// Read the format and dimensions from the header only.
fn probe(path: &Path) -> Result<(Option<ImageFormat>, (u32, u32)), ScaleError> {
    let reader = ImageReader::open(path)
        .map_err(|e| unreadable(path, e))?
        .with_guessed_format()
        .map_err(|e| unreadable(path, e))?;
    let format = reader.format();
    let (width, height) = reader.into_dimensions().map_err(|e| unreadable(path, e))?;
    if width == 0 || height == 0 {
        return Err(unreadable(path, "image has no pixels"));
    }
    Ok((format, (width, height)))
}

/// Full decode under the memory ceiling.
fn decode_whole(path: &Path, limits: DecodeLimits) -> Result<DynamicImage, ScaleError> {
    let mut reader = ImageReader::open(path)
        .map_err(|e| unreadable(path, e))?
        .with_guessed_format()
        .map_err(|e| unreadable(path, e))?;
    reader.limits(limits.to_image_limits());
    reader.decode().map_err(map_image_error)
}
