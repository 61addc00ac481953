//! Extractor configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file only needs the keys it wants to override.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! input_dir = "input"       # Documents are read from here (non-recursive)
//! output_dir = "output"     # One <name>.zip per document lands here
//! temp_dir = "temp"         # Per-document staging directories
//!
//! [filters]
//! min_kb = 5                # Byte-size floor in KB (<= 0 = disabled)
//! min_width = 0             # Pixel floors (<= 0 = disabled)
//! min_height = 0
//!
//! [dedup]
//! enabled = true            # Collapse byte-identical images per document
//!
//! [output]
//! format = "zip"            # Anything other than "zip" disables archiving
//!
//! [logging]
//! level = "info"
//! log_file = "logs/run.log" # Empty string disables the file sink
//!
//! [processing]
//! max_processes = 4         # Max parallel documents (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Fully resolved extractor configuration.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Input, output and staging directories.
    pub paths: PathsConfig,
    /// Byte-size and pixel-dimension floors.
    pub filters: FiltersConfig,
    /// Per-document duplicate suppression.
    pub dedup: DedupConfig,
    /// Archive output settings.
    pub output: OutputConfig,
    /// Log level and log file.
    pub logging: LoggingConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ExtractorConfig {
    /// Validate config values and normalize the output format.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.output.format = self.output.format.trim().to_lowercase();
        self.logging.level = self.logging.level.trim().to_lowercase();
        if self.paths.input_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "paths.input_dir must not be empty".into(),
            ));
        }
        if self.paths.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "paths.output_dir must not be empty".into(),
            ));
        }
        if self.paths.temp_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "paths.temp_dir must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Directory locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            temp_dir: PathBuf::from("temp"),
        }
    }
}

/// Filter floors. A floor of `0` or below disables that check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiltersConfig {
    /// Images smaller than this many kilobytes are rejected.
    pub min_kb: i64,
    /// Images narrower than this many pixels are rejected.
    pub min_width: i64,
    /// Images shorter than this many pixels are rejected.
    pub min_height: i64,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            min_kb: 5,
            min_width: 0,
            min_height: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupConfig {
    pub enabled: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Archive format. Only `"zip"` produces output.
    pub format: String,
}

impl OutputConfig {
    /// Whether surviving images get bundled into an archive.
    pub fn archives_enabled(&self) -> bool {
        self.format == "zip"
    }

    /// File extension of the archive, when archiving is enabled.
    pub fn archive_extension(&self) -> Option<&'static str> {
        self.archives_enabled().then_some("zip")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "zip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level filter. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Log file path. Empty disables file logging.
    pub log_file: String,
}

impl LoggingConfig {
    pub fn log_path(&self) -> Option<&Path> {
        let trimmed = self.log_file.trim();
        (!trimmed.is_empty()).then(|| Path::new(trimmed))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: "logs/run.log".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of documents processed concurrently.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ExtractorConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ExtractorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let mut config: ExtractorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, falling back to stock defaults when it
/// does not exist.
pub fn load_config(path: &Path) -> Result<ExtractorConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    resolve_config(overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# docimg Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Directories
# ---------------------------------------------------------------------------
[paths]
# Documents (.pdf, .docx) are read from this directory, non-recursively.
input_dir = "input"

# One <document-name>.zip is written here per document with surviving images.
output_dir = "output"

# Per-document staging directories. Always cleaned up after each document.
temp_dir = "temp"

# ---------------------------------------------------------------------------
# Filters
# ---------------------------------------------------------------------------
[filters]
# Images smaller than this many kilobytes are dropped. 0 or less keeps
# everything.
min_kb = 5

# Pixel floors. 0 or less disables the check. Images whose dimensions cannot be
# read are never dropped on dimensions.
min_width = 0
min_height = 0

# ---------------------------------------------------------------------------
# Deduplication
# ---------------------------------------------------------------------------
[dedup]
# Keep only the first copy of byte-identical images within a document.
enabled = true

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Archive format. Only "zip" is supported; any other value disables archiving.
format = "zip"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# trace | debug | info | warn | error. RUST_LOG overrides this when set.
level = "info"

# Log file, in addition to stderr. Empty string disables the file.
log_file = "logs/run.log"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum documents processed in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
