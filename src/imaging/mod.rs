//! Image downscaling, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` (header only) |
//! | **Scaled JPEG decode** | `jpeg-decoder` DCT scaling (1/2, 1/4, 1/8) |
//! | **Subsampled PNG decode** | `png` row streaming with block averaging |
//! | **Whole decodes** | `image` crate under `image::Limits` |
//! | **Resize** | `resize_exact` with `Lanczos3` |
//! | **Encode** | `image::codecs::jpeg::JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Bounds, quality, and decode limits
//! - **Downscale**: The three `scale_to_fit*` entry points
//! - **Reduced**: Decoders that never hold the full-resolution buffer
//! - **Encode**: JPEG payloads for upload

mod calculations;
pub mod downscale;
pub mod encode;
mod params;
mod reduced;

pub use calculations::{
    calculate_fit_dimensions, calculate_sample_factor, fits_within, oriented_bounds, should_swap,
};
pub use downscale::{ScaleError, scale_to_fit, scale_to_fit_from_memory, scale_to_fit_from_path};
pub use encode::encode_jpeg;
pub use params::{Bounds, DecodeLimits, Quality};
