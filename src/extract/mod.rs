//! Format-specific image extraction.
//!
//! Each extractor walks a document's internal image objects and hands every
//! candidate to an [`ImageStager`], which owns the per-document state
//! (accepted hashes, ordinal counter, statistics) and applies the same
//! dedup → size → dimension pipeline regardless of container format.
//!
//! | Format | Enumeration | Module |
//! |---|---|---|
//! | PDF | pages in order, image XObjects per page (through Form XObjects) | [`pdf`] |
//! | DOCX | package parts with an `image/*` content type, package order | [`docx`] |
//!
//! ## Staging filenames
//!
//! ```text
//! temp/<document>/
//! ├── image_001_p001.jpg    # PDF: non-duplicate ordinal + page number
//! ├── image_002_p003.png
//! └── image_004.png         # DOCX: position of the part in the package
//! ```
//!
//! ## Failure tiers
//!
//! A failure tied to one image ([`StageError`]) is counted in
//! [`ExtractionStats::errors`] and extraction moves on. A failure that
//! prevents enumerating the document at all ([`ExtractError`]) propagates to
//! the pipeline, which reports the whole document as failed.

pub mod docx;
pub mod pdf;
mod stager;

pub use stager::{ImageStager, StageOutcome};

use crate::config::ExtractorConfig;
use crate::imaging::ImageProbe;
use serde::Serialize;
use std::ops::AddAssign;
use std::path::Path;
use thiserror::Error;

/// Document-level extraction failure.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Package error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Malformed package: {0}")]
    Package(String),
}

/// Failure while processing a single image. Always counted, never propagated.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unreadable image stream: {0}")]
    Stream(String),
}

/// Per-document counters.
///
/// Every discovered image lands in exactly one bucket, so
/// `found == saved + duplicates + filtered_small + filtered_dims + errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub found: u32,
    pub saved: u32,
    pub duplicates: u32,
    pub filtered_small: u32,
    pub filtered_dims: u32,
    pub errors: u32,
}

impl ExtractionStats {
    /// Whether the counters add up.
    pub fn is_consistent(&self) -> bool {
        self.found
            == self.saved
                + self.duplicates
                + self.filtered_small
                + self.filtered_dims
                + self.errors
    }
}

impl AddAssign for ExtractionStats {
    fn add_assign(&mut self, other: Self) {
        self.found += other.found;
        self.saved += other.saved;
        self.duplicates += other.duplicates;
        self.filtered_small += other.filtered_small;
        self.filtered_dims += other.filtered_dims;
        self.errors += other.errors;
    }
}

/// How a candidate's staging filename is numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// `image_<seq>_p<page>`: `seq` is assigned by the stager and only
    /// advances for non-duplicate images.
    PageSequence { page: u32 },
    /// `image_<index>`: fixed position in the document's image list.
    Position { index: u32 },
}

/// One raw image pulled out of a document, before classification.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub bytes: Vec<u8>,
    /// Declared format, e.g. `"jpeg"` or `"png"`; normalized when staged.
    pub format_tag: String,
    pub naming: Naming,
}

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Classify a path by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if ext.eq_ignore_ascii_case("docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }
}

/// Run the extractor for `kind` over `document`, staging survivors in `staging_dir`.
pub fn extract<P: ImageProbe + ?Sized>(
    kind: DocumentKind,
    document: &Path,
    staging_dir: &Path,
    config: &ExtractorConfig,
    probe: &P,
) -> Result<ExtractionStats, ExtractError> {
    match kind {
        DocumentKind::Pdf => pdf::extract_pdf(document, staging_dir, config, probe),
        DocumentKind::Docx => docx::extract_docx(document, staging_dir, config, probe),
    }
}
