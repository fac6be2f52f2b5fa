//! Error types for trace analysis
//!
//! Only conditions that make a whole run meaningless are errors. Malformed
//! lines, unreadable files inside a directory scan and missing optional
//! fields are recovered and reported as data instead.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised by the analysis core
#[derive(Debug, Error)]
pub enum TraceError {
    /// A requested trace source could not be opened at all
    #[error("Failed to open trace source {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be read or parsed
    #[error("Failed to parse configuration {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// A directory comparison needs at least two traces
    #[error("Not enough traces for comparison in {}: found {found}, need 2", dir.display())]
    NotEnoughTraces { dir: PathBuf, found: usize },
}

pub type Result<T> = std::result::Result<T, TraceError>;
