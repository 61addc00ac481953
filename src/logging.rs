//! `tracing` subscriber setup.
//!
//! Events go to stderr in compact form, so stdout stays clean for the
//! report and `--json` output. When `logging.log_file` is set, the same
//! events are appended to that file without ANSI colors.
//!
//! `RUST_LOG` overrides `logging.level` when present.

use crate::config::LoggingConfig;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Log file error: {0}")]
    Io(#[from] io::Error),
    #[error("Logger already initialized: {0}")]
    Init(#[from] TryInitError),
}

/// Level filter from `RUST_LOG`, else `level`, else `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Open `path` for appending, creating it and its parent directory.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(io::stderr);

    let file = match config.log_path() {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(console)
        .with(file)
        .try_init()?;
    Ok(())
}
