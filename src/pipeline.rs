//! Per-document orchestration and batch runs.
//!
//! ```text
//! input/report.pdf
//!   → temp/report/          staging (cleared, then removed on every path)
//!   → extract + filter      ExtractionStats
//!   → output/report.zip     only when saved > 0 and format = "zip"
//! ```
//!
//! Documents are independent. A batch fans out over the rayon global pool,
//! one task per base name: `a.pdf` and `a.docx` share `temp/a/` and
//! `output/a.zip`, so they run one after the other on the same worker.
//! Reports come back in input order regardless of completion order.

use crate::archive::{ArchiveError, build_archive};
use crate::config::ExtractorConfig;
use crate::dedup::content_hash;
use crate::extract::{self, DocumentKind, ExtractError, ExtractionStats};
use crate::imaging::ImageProbe;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Staging error: {0}")]
    Staging(#[from] io::Error),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Per-document staging directory, removed when dropped.
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Clear any leftover `<temp_root>/<name>` and create it fresh.
    ///
    /// `name` must be a single plain path component: anything else could
    /// resolve outside `temp_root`, and the directory is removed recursively.
    pub fn acquire(temp_root: &Path, name: &str) -> io::Result<Self> {
        if !is_plain_component(name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("staging name {name:?} is not a plain file name"),
            ));
        }
        let path = temp_root.join(name);
        debug_assert_eq!(path.parent(), Some(temp_root));
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(dir = %self.path.display(), error = %e, "failed to remove staging directory");
        }
    }
}

/// What happened to one input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentOutcome {
    Processed {
        stats: ExtractionStats,
        /// Archive written for this document, if any.
        archive: Option<PathBuf>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    /// File name of the input, e.g. `report.pdf`.
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

/// Aggregate of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Every input handed to the batch, including skipped ones.
    pub files: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Sum of the stats of successfully processed documents.
    pub total: ExtractionStats,
    /// One report per input, in input order.
    pub reports: Vec<DocumentReport>,
}

impl BatchSummary {
    pub fn from_reports(reports: Vec<DocumentReport>) -> Self {
        let mut summary = Self {
            files: reports.len(),
            ..Self::default()
        };
        for report in &reports {
            match &report.outcome {
                DocumentOutcome::Processed { stats, .. } => summary.total += *stats,
                DocumentOutcome::Skipped { .. } => summary.skipped += 1,
                DocumentOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary.reports = reports;
        summary
    }
}

fn is_plain_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Name used for the staging directory and the archive.
///
/// The file stem when it is a plain file name. Stems such as `..` or `.`
/// (from `...pdf` or `..pdf`) are replaced by `_` plus a hash of the stem,
/// which stays stable so same-stem documents still share a name.
pub fn staging_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if is_plain_component(&stem) {
        stem
    } else {
        format!("_{}", &content_hash(stem.as_bytes())[..16])
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn unsupported_reason(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    format!("unsupported extension ({ext})")
}

/// Extract, filter and archive one document.
///
/// Never fails: every problem is folded into the returned outcome, and the
/// staging directory is gone by the time this returns.
pub fn process_document<P: ImageProbe + ?Sized>(
    path: &Path,
    config: &ExtractorConfig,
    probe: &P,
) -> DocumentOutcome {
    let Some(kind) = DocumentKind::from_path(path) else {
        let reason = unsupported_reason(path);
        info!(file = %path.display(), %reason, "skipping document");
        return DocumentOutcome::Skipped { reason };
    };

    info!(file = %path.display(), ?kind, "processing document");
    match run_document(kind, path, config, probe) {
        Ok((stats, archive)) => {
            info!(
                file = %path.display(),
                found = stats.found,
                saved = stats.saved,
                duplicates = stats.duplicates,
                filtered_small = stats.filtered_small,
                filtered_dims = stats.filtered_dims,
                errors = stats.errors,
                "document done"
            );
            DocumentOutcome::Processed { stats, archive }
        }
        Err(e) => {
            error!(file = %path.display(), error = %e, "document failed");
            DocumentOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}

fn run_document<P: ImageProbe + ?Sized>(
    kind: DocumentKind,
    path: &Path,
    config: &ExtractorConfig,
    probe: &P,
) -> Result<(ExtractionStats, Option<PathBuf>), PipelineError> {
    let base = staging_name(path);
    let staging = StagingDir::acquire(&config.paths.temp_dir, &base)?;
    let stats = extract::extract(kind, path, staging.path(), config, probe)?;

    let archive = match config.output.archive_extension() {
        Some(ext) if stats.saved > 0 => {
            let destination = config.paths.output_dir.join(format!("{base}.{ext}"));
            if let Err(e) = build_archive(staging.path(), &destination) {
                let _ = fs::remove_file(&destination);
                return Err(e.into());
            }
            Some(destination)
        }
        _ => None,
    };

    Ok((stats, archive))
}

/// Regular files directly in `dir` with a `.pdf` or `.docx` extension,
/// sorted by name.
pub fn list_input_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && DocumentKind::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Process every file, in parallel across base names.
///
/// When `progress` is given, each report is sent as soon as its document
/// finishes.
pub fn run_batch<P: ImageProbe + ?Sized>(
    files: &[PathBuf],
    config: &ExtractorConfig,
    probe: &P,
    progress: Option<Sender<DocumentReport>>,
) -> BatchSummary {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: HashMap<String, usize> = HashMap::new();
    for (i, path) in files.iter().enumerate() {
        let slot = *group_of.entry(staging_name(path)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }

    let mut indexed: Vec<(usize, DocumentReport)> = groups
        .par_iter()
        .flat_map_iter(|group| {
            let progress = progress.clone();
            group
                .iter()
                .map(|&i| {
                    let path = &files[i];
                    let report = DocumentReport {
                        name: file_name(path),
                        path: path.clone(),
                        outcome: process_document(path, config, probe),
                    };
                    if let Some(tx) = &progress {
                        let _ = tx.send(report.clone());
                    }
                    (i, report)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    indexed.sort_by_key(|(i, _)| *i);
    BatchSummary::from_reports(indexed.into_iter().map(|(_, r)| r).collect())
}
