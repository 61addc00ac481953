use super::{ExtractionStats, ImageCandidate, Naming, StageError};
use crate::config::{ExtractorConfig, FiltersConfig};
use crate::dedup::{AcceptedHashes, content_hash};
use crate::filter::{Classification, classify};
use crate::imaging::{ImageProbe, normalize_extension};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Result of staging one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Classified(Classification),
    Failed(String),
}

/// Per-document image staging state.
///
/// Owns everything that is shared across the images of one document: the
/// accepted-hash set, the ordinal counter and the statistics. One stager is
/// created per extraction run and consumed by [`finish`](Self::finish).
pub struct ImageStager<'a, P: ImageProbe + ?Sized> {
    staging_dir: &'a Path,
    filters: &'a FiltersConfig,
    probe: &'a P,
    hashes: AcceptedHashes,
    next_seq: u32,
    stats: ExtractionStats,
}

impl<'a, P: ImageProbe + ?Sized> ImageStager<'a, P> {
    pub fn new(staging_dir: &'a Path, config: &'a ExtractorConfig, probe: &'a P) -> Self {
        Self {
            staging_dir,
            filters: &config.filters,
            probe,
            hashes: AcceptedHashes::new(config.dedup.enabled),
            next_seq: 0,
            stats: ExtractionStats::default(),
        }
    }

    /// Count, dedup, persist and filter one candidate.
    ///
    /// The candidate is consumed; its bytes are released when this returns.
    pub fn stage(&mut self, candidate: ImageCandidate) -> StageOutcome {
        self.stats.found += 1;

        let hash = content_hash(&candidate.bytes);
        if self.hashes.is_duplicate(&hash) {
            debug!(hash = %hash, "duplicate image skipped");
            return self.tally(Classification::Duplicate);
        }

        let path = self.staging_dir.join(self.file_name(&candidate));
        match self.persist_and_classify(&path, &candidate.bytes) {
            Ok(classification) => {
                if classification == Classification::Accepted {
                    self.hashes.accept(hash);
                }
                debug!(file = %path.display(), ?classification, "image classified");
                self.tally(classification)
            }
            Err(e) => {
                self.stats.errors += 1;
                let _ = fs::remove_file(&path);
                warn!(file = %path.display(), error = %e, "failed to stage image");
                StageOutcome::Failed(e.to_string())
            }
        }
    }

    /// Count an image that was discovered but whose bytes could not be read.
    pub fn record_failure(&mut self, error: &StageError) -> StageOutcome {
        self.stats.found += 1;
        self.stats.errors += 1;
        warn!(error = %error, "failed to extract image");
        StageOutcome::Failed(error.to_string())
    }

    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    pub fn finish(self) -> ExtractionStats {
        self.stats
    }

    fn tally(&mut self, classification: Classification) -> StageOutcome {
        match classification {
            Classification::Accepted => self.stats.saved += 1,
            Classification::Duplicate => self.stats.duplicates += 1,
            Classification::TooSmall => self.stats.filtered_small += 1,
            Classification::TooSmallDims => self.stats.filtered_dims += 1,
        }
        StageOutcome::Classified(classification)
    }

    fn file_name(&mut self, candidate: &ImageCandidate) -> String {
        let ext = normalize_extension(&candidate.format_tag);
        match candidate.naming {
            Naming::PageSequence { page } => {
                self.next_seq += 1;
                format!("image_{:03}_p{:03}.{}", self.next_seq, page, ext)
            }
            Naming::Position { index } => format!("image_{:03}.{}", index, ext),
        }
    }

    /// Write the bytes, then apply size and dimension filters to the written
    /// file. Rejected files are removed before returning.
    fn persist_and_classify(&self, path: &Path, bytes: &[u8]) -> Result<Classification, StageError> {
        fs::write(path, bytes)?;
        let byte_count = fs::metadata(path)?.len();
        let classification = classify(byte_count, self.filters, || self.probe.probe_file(path));
        if classification != Classification::Accepted {
            fs::remove_file(path)?;
        }
        Ok(classification)
    }
}
