//! Parameter types for image operations.
//!
//! - [`Bounds`]: a target width/height box in pixels.
//! - [`Quality`]: lossy encoding quality (1-100, default 75). Clamped on construction.
//! - [`DecodeLimits`]: memory ceiling applied while decoding a source.

/// A bounding box in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Memory ceiling for a single decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_alloc_bytes: u64,
}

impl DecodeLimits {
    pub fn from_megabytes(mb: u64) -> Self {
        Self {
            max_alloc_bytes: mb.saturating_mul(1024 * 1024),
        }
    }

    pub(crate) fn to_image_limits(self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_alloc = Some(self.max_alloc_bytes);
        limits
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::from_megabytes(512)
    }
}
