//! Decoders that produce a subsampled buffer without ever holding the
//! full-resolution image.
//!
//! - JPEG: DCT-domain scaling inside `jpeg-decoder` (1/2, 1/4, 1/8).
//! - PNG: rows are streamed through `png` and averaged in `factor`×`factor`
//!   blocks, so only one accumulator row and the reduced output are live.
//!
//! Interlaced PNGs arrive pass by pass rather than row by row and are not
//! supported here.

use super::downscale::{ScaleError, unreadable};
use super::params::DecodeLimits;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

fn ensure_fits(
    path: &Path,
    (width, height): (u32, u32),
    bytes_per_pixel: usize,
    limits: DecodeLimits,
) -> Result<(), ScaleError> {
    let needed = u64::from(width) * u64::from(height) * bytes_per_pixel as u64;
    if needed > limits.max_alloc_bytes {
        return Err(ScaleError::ResourceExhausted(format!(
            "{}: {width}x{height} needs {needed} bytes, limit is {}",
            path.display(),
            limits.max_alloc_bytes
        )));
    }
    Ok(())
}

fn buffer_mismatch(path: &Path) -> ScaleError {
    unreadable(path, "decoded buffer does not match its dimensions")
}

// =============================================================================
// JPEG
// =============================================================================

/// Decode a JPEG directly at a reduced scale (1/2, 1/4 or 1/8).
///
/// Factors beyond 8 decode at 1/8 and leave the rest to the final resize.
pub(crate) fn decode_jpeg_scaled(
    path: &Path,
    source: (u32, u32),
    factor: u32,
    limits: DecodeLimits,
) -> Result<DynamicImage, ScaleError> {
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    decoder.read_info().map_err(|e| unreadable(path, e))?;

    let requested = (
        to_u16(source.0.div_ceil(factor)),
        to_u16(source.1.div_ceil(factor)),
    );
    let (width, height) = decoder
        .scale(requested.0, requested.1)
        .map_err(|e| unreadable(path, e))?;
    let (width, height) = (u32::from(width), u32::from(height));

    let info = decoder
        .info()
        .ok_or_else(|| unreadable(path, "missing JPEG header"))?;
    ensure_fits(path, (width, height), info.pixel_format.pixel_bytes(), limits)?;
    decoder.set_max_decoding_buffer_size(
        usize::try_from(limits.max_alloc_bytes).unwrap_or(usize::MAX),
    );

    let pixels = decoder.decode().map_err(|e| unreadable(path, e))?;
    debug!(width, height, "decoded JPEG at reduced scale");

    let image = match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => {
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        jpeg_decoder::PixelFormat::RGB24 => {
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        jpeg_decoder::PixelFormat::CMYK32 => {
            RgbImage::from_raw(width, height, cmyk_to_rgb(&pixels)).map(DynamicImage::ImageRgb8)
        }
        other => {
            return Err(unreadable(
                path,
                format!("unsupported JPEG pixel format {other:?}"),
            ));
        }
    };
    image.ok_or_else(|| buffer_mismatch(path))
}

fn to_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn cmyk_to_rgb(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    for px in input.chunks_exact(4) {
        let k = f32::from(px[3]) / 255.0;
        for &channel in &px[..3] {
            let c = f32::from(channel) / 255.0;
            let cmy = c * (1.0 - k) + k;
            out.push(((1.0 - cmy) * 255.0).round() as u8);
        }
    }
    out
}

// =============================================================================
// PNG
// =============================================================================

/// Averages `factor`×`factor` pixel blocks from a stream of rows.
///
/// Trailing rows and columns that do not fill a whole block are dropped.
struct BlockAverager {
    factor: usize,
    channels: usize,
    out_width: usize,
    sums: Vec<u32>,
    rows_in_block: usize,
    out: Vec<u8>,
}

impl BlockAverager {
    fn new(out_width: usize, out_height: usize, channels: usize, factor: usize) -> Self {
        Self {
            factor,
            channels,
            out_width,
            sums: vec![0; out_width * channels],
            rows_in_block: 0,
            out: Vec::with_capacity(out_width * out_height * channels),
        }
    }

    fn push_row(&mut self, row: &[u8]) {
        let block = self.factor * self.channels;
        for (x, sums) in self.sums.chunks_exact_mut(self.channels).enumerate() {
            let start = x * block;
            for px in row[start..start + block].chunks_exact(self.channels) {
                for (sum, &value) in sums.iter_mut().zip(px) {
                    *sum += u32::from(value);
                }
            }
        }

        self.rows_in_block += 1;
        if self.rows_in_block == self.factor {
            let area = (self.factor * self.factor) as u32;
            self.out
                .extend(self.sums.iter().map(|&sum| ((sum + area / 2) / area) as u8));
            self.sums.fill(0);
            self.rows_in_block = 0;
        }
    }

    fn rows_done(&self) -> usize {
        self.out.len() / (self.out_width * self.channels)
    }

    fn finish(self) -> Vec<u8> {
        self.out
    }
}

/// Stream a non-interlaced PNG and box-average it down by `factor`.
pub(crate) fn decode_png_subsampled(
    path: &Path,
    factor: u32,
    limits: DecodeLimits,
) -> Result<DynamicImage, ScaleError> {
    let file = File::open(path).map_err(|e| unreadable(path, e))?;
    let mut decoder = png::Decoder::new_with_limits(
        BufReader::new(file),
        png::Limits {
            bytes: usize::try_from(limits.max_alloc_bytes).unwrap_or(usize::MAX),
        },
    );
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(|e| unreadable(path, e))?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    if interlaced {
        return Err(ScaleError::Unsupported(format!(
            "{}: interlaced PNG cannot be decoded at reduced size",
            path.display()
        )));
    }

    let (color, _) = reader.output_color_type();
    let channels = color.samples();
    let (out_width, out_height) = (width / factor, height / factor);
    if out_width == 0 || out_height == 0 {
        return Err(unreadable(path, "image is smaller than one sample block"));
    }
    ensure_fits(path, (out_width, out_height), channels, limits)?;

    let factor = factor as usize;
    let mut averager =
        BlockAverager::new(out_width as usize, out_height as usize, channels, factor);
    while averager.rows_done() < out_height as usize {
        let Some(row) = reader.next_row().map_err(|e| unreadable(path, e))? else {
            break;
        };
        averager.push_row(row.data());
    }
    if averager.rows_done() < out_height as usize {
        return Err(unreadable(path, "PNG ended before its last row"));
    }
    debug!(
        width = out_width,
        height = out_height,
        factor,
        "decoded PNG by block averaging"
    );

    let pixels = averager.finish();
    let image = match channels {
        1 => GrayImage::from_raw(out_width, out_height, pixels).map(DynamicImage::ImageLuma8),
        2 => {
            GrayAlphaImage::from_raw(out_width, out_height, pixels).map(DynamicImage::ImageLumaA8)
        }
        3 => RgbImage::from_raw(out_width, out_height, pixels).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(out_width, out_height, pixels).map(DynamicImage::ImageRgba8),
        _ => None,
    };
    image.ok_or_else(|| buffer_mismatch(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmyk_conversion_extremes() {
        // No ink → white; full key → black.
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
    }

    #[test]
    fn averager_rounds_block_means() {
        // 4x2 grey image, factor 2 → 2x1.
        let mut averager = BlockAverager::new(2, 1, 1, 2);
        averager.push_row(&[0, 10, 100, 101]);
        assert_eq!(averager.rows_done(), 0);
        averager.push_row(&[20, 30, 100, 102]);
        assert_eq!(averager.rows_done(), 1);
        assert_eq!(averager.finish(), vec![15, 101]);
    }

    #[test]
    fn averager_keeps_channels_apart() {
        let mut averager = BlockAverager::new(1, 1, 3, 2);
        averager.push_row(&[255, 0, 0, 255, 0, 0]);
        averager.push_row(&[0, 0, 255, 0, 0, 255]);
        assert_eq!(averager.finish(), vec![128, 0, 128]);
    }

    #[test]
    fn averager_drops_partial_trailing_column() {
        // Width 5 with factor 2 → 2 output columns; the fifth pixel is ignored.
        let mut averager = BlockAverager::new(2, 1, 1, 2);
        averager.push_row(&[2, 2, 4, 4, 255]);
        averager.push_row(&[2, 2, 4, 4, 255]);
        assert_eq!(averager.finish(), vec![2, 4]);
    }
}
