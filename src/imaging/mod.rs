//! Image inspection, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Dimensions** | `image::ImageReader::into_dimensions`, `avif-parse` |
//! | **Extension** | [`normalize_extension`] |
//!
//! The module is split into:
//! - **Probe**: [`ImageProbe`] trait + [`Dimensions`]
//! - **Rust probe**: [`RustProbe`], the production implementation
//! - **Extension**: format tag → file extension mapping
//!
//! Nothing here re-encodes images. Extracted bytes are staged and archived
//! exactly as the document stored them.

pub mod extension;
pub mod probe;
pub mod rust_probe;

pub use extension::normalize_extension;
pub use probe::{Dimensions, ImageProbe};
pub use rust_probe::{RustProbe, probe_dimensions, probe_file_dimensions};
