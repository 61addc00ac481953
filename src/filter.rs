//! Keep/reject policy for candidate images.
//!
//! Checks run cheapest first: duplicate lookup, then byte size, then pixel
//! dimensions. The duplicate lookup belongs to the per-document
//! [`AcceptedHashes`](crate::dedup::AcceptedHashes) and happens before an
//! image is written; [`classify`] covers the two floors that run on the
//! written file. An image rejected on size is never probed.

use crate::config::FiltersConfig;
use crate::imaging::Dimensions;

/// Outcome of classifying one candidate image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Accepted,
    Duplicate,
    TooSmall,
    TooSmallDims,
}

/// True iff `byte_count / 1024 < min_kb`.
///
/// `min_kb <= 0` never rejects, not even empty images.
pub fn is_too_small_by_size(byte_count: u64, min_kb: i64) -> bool {
    match u64::try_from(min_kb) {
        // x / 1024 < k  <=>  x < 1024 * k  for integer k
        Ok(kb) => byte_count < kb.saturating_mul(1024),
        Err(_) => false,
    }
}

/// True when at least one pixel floor is active.
pub fn dimension_filter_enabled(min_width: i64, min_height: i64) -> bool {
    min_width > 0 || min_height > 0
}

/// Pixel-dimension floor check. A floor `<= 0` is disabled.
///
/// Unknown dimensions never fail: an image the probe cannot read is kept.
pub fn fails_dimension_filter(dims: Option<Dimensions>, min_width: i64, min_height: i64) -> bool {
    if !dimension_filter_enabled(min_width, min_height) {
        return false;
    }
    let Some(Dimensions { width, height }) = dims else {
        return false;
    };
    (min_width > 0 && i64::from(width) < min_width)
        || (min_height > 0 && i64::from(height) < min_height)
}

/// Classify a written, non-duplicate candidate against the size and
/// dimension floors.
///
/// `probe` is only invoked when the size filter passes and a pixel floor is
/// active, so callers can defer the dimension read until it is needed.
pub fn classify(
    byte_count: u64,
    filters: &FiltersConfig,
    probe: impl FnOnce() -> Option<Dimensions>,
) -> Classification {
    if is_too_small_by_size(byte_count, filters.min_kb) {
        return Classification::TooSmall;
    }
    if !dimension_filter_enabled(filters.min_width, filters.min_height) {
        return Classification::Accepted;
    }
    if fails_dimension_filter(probe(), filters.min_width, filters.min_height) {
        return Classification::TooSmallDims;
    }
    Classification::Accepted
}
