//! Dimension probing trait and shared types.
//!
//! The [`ImageProbe`] trait is the seam between the extractors and image
//! decoding. The production implementation is
//! [`RustProbe`](super::rust_probe::RustProbe); tests substitute
//! [`MockProbe`](tests::MockProbe) to control what the filters see.
//!
//! Probing is tolerant by contract: an image that cannot be decoded yields
//! `None`, never an error. Callers treat `None` as "do not reject on
//! dimensions".

use std::path::Path;

/// Pixel dimensions of a decoded image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for dimension probes.
///
/// `Sync` so a single probe can be shared by every document worker.
pub trait ImageProbe: Sync {
    /// Pixel dimensions of an image file, or `None` if unreadable.
    fn probe_file(&self, path: &Path) -> Option<Dimensions>;
}
