//! Zip archive of a staging directory.
//!
//! Entries are named relative to the staging root with `/` separators and
//! written in file-name order, so the same staging contents always produce
//! the same entry list.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Zip every regular file under `staging_dir` into `destination`.
///
/// Creates the destination's parent directory and overwrites an existing
/// archive. Returns the number of entries written.
pub fn build_archive(staging_dir: &Path, destination: &Path) -> Result<usize, ArchiveError> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut zip = ZipWriter::new(BufWriter::new(File::create(destination)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for entry in WalkDir::new(staging_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(staging_dir) else {
            continue;
        };
        zip.start_file(entry_name(relative), options)?;
        io::copy(&mut File::open(entry.path())?, &mut zip)?;
        count += 1;
    }

    zip.finish()?.flush()?;
    Ok(count)
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
