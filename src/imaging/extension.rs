//! Canonical file extensions for staged images.

/// Fallback for empty or unusable format tags.
pub const FALLBACK_EXTENSION: &str = "bin";

/// Map a raw or guessed format tag to a canonical file extension.
///
/// - `"JPEG"`, `".jpe"` → `"jpg"`
/// - `"TIF"` → `"tiff"`
/// - `""` → `"bin"`
/// - anything else is lower-cased and passed through (`"webp"` → `"webp"`)
///
/// Tags that could not form a flat file name (path separators, spaces,
/// punctuation other than `-`, `+`, `_`) fall back to `"bin"`.
pub fn normalize_extension(raw: &str) -> String {
    let ext = raw.trim().trim_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "" => FALLBACK_EXTENSION.to_string(),
        "jpeg" | "jpe" => "jpg".to_string(),
        "tif" => "tiff".to_string(),
        _ if ext
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_')) =>
        {
            ext
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}
