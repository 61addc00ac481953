//! Pure Rust dimension probe.
//!
//! ## Crate mapping
//!
//! | Format | Crate / function |
//! |---|---|
//! | JPEG, PNG, GIF, BMP, TIFF, WebP | `image::ImageReader::into_dimensions` (header only) |
//! | AVIF | `avif-parse` container metadata |
//!
//! The format is always sniffed from content, never from the file extension:
//! staged files carry whatever extension the document declared, which may
//! be wrong.

use super::probe::{Dimensions, ImageProbe};
use image::ImageReader;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

/// Probe backed by the `image` crate decoders.
pub struct RustProbe;

impl RustProbe {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// ISO-BMFF `ftyp` brands that identify an AVIF still or sequence.
fn is_avif(header: &[u8]) -> bool {
    header.len() >= 12 && &header[4..8] == b"ftyp" && matches!(&header[8..12], b"avif" | b"avis")
}

/// Dimensions from an AVIF container's primary item (no AV1 decode needed).
fn probe_avif(bytes: &[u8]) -> Option<Dimensions> {
    let avif = avif_parse::read_avif(&mut Cursor::new(bytes)).ok()?;
    let meta = avif.primary_item_metadata().ok()?;
    Some(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

fn probe_reader<R: std::io::BufRead + Seek>(reader: R) -> Option<Dimensions> {
    ImageReader::new(reader)
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
        .map(Dimensions::from)
}

/// Pixel dimensions of an in-memory image, or `None` if it can't be read.
pub fn probe_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    if is_avif(bytes) {
        return probe_avif(bytes);
    }
    probe_reader(Cursor::new(bytes))
}

/// Pixel dimensions of an image file, or `None` if it can't be read.
pub fn probe_file_dimensions(path: &Path) -> Option<Dimensions> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut header = [0u8; 12];
    let n = file.read(&mut header).ok()?;
    if is_avif(&header[..n]) {
        let bytes = std::fs::read(path).ok()?;
        return probe_avif(&bytes);
    }
    file.rewind().ok()?;
    probe_reader(BufReader::new(file))
}

impl ImageProbe for RustProbe {
    fn probe_file(&self, path: &Path) -> Option<Dimensions> {
        probe_file_dimensions(path)
    }
}
