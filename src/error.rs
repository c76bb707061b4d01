use std::path::PathBuf;
use thiserror::Error;

/// Conditions that halt a load. Field and aggregate problems never show up
/// here; they degrade in place.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("source {path} has no header row")]
    SourceEmpty { path: PathBuf },

    #[error("source {path} repeats column '{name}' (names are case-insensitive)")]
    DuplicateColumn { path: PathBuf, name: String },

    #[error("failed to read source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("destination {path} is not writable: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sqlite: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid column pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to write report {path}: {message}")]
    Report { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, LoadError>;
