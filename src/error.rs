//! Error types for the evaluation pipeline.
//!
//! Only conditions that abort a whole pass are errors. Problems confined to a
//! single log file (unparseable name, unresolved workload, unreadable file)
//! are recorded as [`SkipReason`](crate::collector::SkipReason) values and
//! counted in the collection summary instead.

use thiserror::Error;

/// Result type alias using the crate error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the evaluation pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parse errors
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or inconsistent run catalog
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Worker pool could not be created
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Input that cannot be processed at all (missing root, malformed table)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a catalog error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
