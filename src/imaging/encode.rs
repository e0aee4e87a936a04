//! Encoding of scaled images into upload payloads.

use super::downscale::ScaleError;
use super::params::Quality;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;

/// Encode an image as baseline JPEG.
///
/// Alpha is dropped; JPEG has no transparency.
pub fn encode_jpeg(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, ScaleError> {
    let mut bytes = Vec::new();
    let quality = u8::try_from(quality.value()).unwrap_or(100);
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| ScaleError::Encode(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn noisy(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) as u8;
            Rgba([v, v.wrapping_add(90), v.wrapping_mul(3), 128])
        }))
    }

    #[test]
    fn produces_decodable_jpeg() {
        let bytes = encode_jpeg(&noisy(120, 80), Quality::default()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
    }

    #[test]
    fn lower_quality_is_smaller() {
        let img = noisy(200, 200);
        let high = encode_jpeg(&img, Quality::new(95)).unwrap();
        let low = encode_jpeg(&img, Quality::new(20)).unwrap();
        assert!(low.len() < high.len());
    }
}
