//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Bounds;

/// Whether swapping the bounds would make their orientation match the source.
///
/// Only gross orientation counts (wide vs. tall). A square source or a
/// square box never triggers a swap.
pub fn should_swap(bounds: Bounds, source: (u32, u32)) -> bool {
    let (src_w, src_h) = source;
    if bounds.width == bounds.height || src_w == src_h {
        return false;
    }
    (bounds.width > bounds.height) != (src_w > src_h)
}

/// Resolve the effective bounds for a source, swapping them if `reversible`
/// and the orientations disagree.
pub fn oriented_bounds(bounds: Bounds, source: (u32, u32), reversible: bool) -> Bounds {
    if reversible && should_swap(bounds, source) {
        bounds.swapped()
    } else {
        bounds
    }
}

/// Whether the source already fits inside the bounds on both axes.
pub fn fits_within(source: (u32, u32), bounds: Bounds) -> bool {
    source.0 <= bounds.width && source.1 <= bounds.height
}

/// Calculate the largest ratio-preserving dimensions that fit the bounds.
///
/// The width-driven scale wins whenever it also satisfies the height bound,
/// in which case the width lands exactly on the bound. Otherwise the height
/// lands exactly on the bound. Never returns a zero dimension.
///
/// # Examples
/// ```
/// # use geohash_core::imaging::{Bounds, calculate_fit_dimensions};
/// assert_eq!(calculate_fit_dimensions((1600, 1200), Bounds::new(800, 600)), (800, 600));
/// assert_eq!(calculate_fit_dimensions((1000, 1000), Bounds::new(800, 600)), (600, 600));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: Bounds) -> (u32, u32) {
    let (src_w, src_h) = (source.0 as f64, source.1 as f64);
    let by_width = bounds.width as f64 / src_w;
    let by_height = bounds.height as f64 / src_h;

    if src_h * by_width <= bounds.height as f64 {
        (bounds.width, round_dimension(src_h * by_width))
    } else {
        (round_dimension(src_w * by_height), bounds.height)
    }
}

fn round_dimension(value: f64) -> u32 {
    (value.round() as u32).max(1)
}

/// Largest power-of-two subsample factor that still leaves the image at
/// least as large as the bounds on both axes.
///
/// Halving stops one step before either working dimension would drop below
/// its bound, so the final filtered resize always has real work to do.
pub fn calculate_sample_factor(source: (u32, u32), bounds: Bounds) -> u32 {
    if bounds.is_empty() {
        return 1;
    }
    let (mut w, mut h) = source;
    let mut factor = 1;
    while w / 2 >= bounds.width && h / 2 >= bounds.height {
        w /= 2;
        h /= 2;
        factor *= 2;
    }
    factor
}
