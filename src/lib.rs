//! # docimg
//!
//! Pulls the embedded images out of PDF and DOCX documents, drops the ones
//! that are too small or byte-identical to one already kept, and bundles the
//! survivors of each document into a zip archive.
//!
//! # Architecture: Per-Document Pipeline
//!
//! Every input document runs the same four steps in isolation:
//!
//! ```text
//! 1. Stage     temp/<name>/         cleared, then created fresh
//! 2. Extract   document → images    format-specific walk (PDF objects, DOCX parts)
//! 3. Filter    dedup → size → dims  rejected files are removed from staging
//! 4. Archive   output/<name>.zip    only when at least one image survived
//! ```
//!
//! The staging directory is removed when the document finishes, whatever the
//! outcome. Documents share nothing, so a batch runs them in parallel and
//! folds their statistics together afterwards.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Staging guard, per-document orchestration, parallel batch runs |
//! | [`extract`] | PDF and DOCX image enumeration, shared staging/counting logic |
//! | [`filter`] | Size and dimension floors, classification of one image |
//! | [`dedup`] | Content hashing and the per-document accepted-hash set |
//! | [`imaging`] | Dimension probing and file-extension normalization |
//! | [`archive`] | Zip archive of a staging directory |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`logging`] | `tracing` subscriber: stderr plus optional log file |
//! | [`output`] | CLI report and summary formatting |
//!
//! # Design Decisions
//!
//! ## Bytes Are Never Re-encoded
//!
//! Images are staged exactly as the document stores them. The only exception
//! is raw PDF pixel data (no image codec at all), which is wrapped losslessly
//! in a PNG container so the result is a viewable file.
//!
//! ## Filters Run on the Written File
//!
//! The size floor is checked against the staged file's length and the
//! dimension floor probes the staged file. What gets archived is exactly
//! what was measured.
//!
//! ## Dedup Is Per Document
//!
//! The same logo in two documents ends up in both archives. Within one
//! document only the first copy that passes every filter is kept; a copy
//! rejected by a filter does not block a later identical copy.

pub mod archive;
pub mod config;
pub mod dedup;
pub mod extract;
pub mod filter;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
