//! Error types for configuration loading.
//!
//! Responsibilities:
//! - Define error variants for every failure in the load/init pipeline.
//! - Carry enough context (paths, variable names, key names) to debug a failure.
//!
//! Does NOT handle:
//! - Reporting reload failures (the watcher logs them, see `watcher.rs`).
//!
//! Invariants:
//! - All error variants include context for debugging (variable names, paths, etc.).
//! - Dotenv errors NEVER include raw .env line contents to prevent secret leakage.

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode config file at {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Strict mode found keys that match no field of the target record.
    #[error(
        "There are keys in the config file at {path} that do not match any field in the given record: {keys:?}"
    )]
    UnmatchedKeys { path: PathBuf, keys: Vec<String> },

    /// An environment value or a `default` literal could not be converted.
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("{field} is required, but blank")]
    RequiredField { field: String },

    #[error("Invalid config target: {reason}")]
    InvalidTarget { reason: String },

    #[error("Unknown config file type: {path}")]
    UnknownFormat { path: PathBuf },

    #[error("Failed to encode config for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Auto-reload requires a running tokio runtime")]
    NoRuntime,

    /// Failed to parse the `.env` file due to invalid syntax.
    ///
    /// SAFETY: This error only includes the byte index of the parse failure,
    /// NOT the offending line content, to prevent leaking secrets.
    #[error(
        "Failed to parse .env file at position {error_index}. Hint: set DOTENV_DISABLED=1 to skip .env loading"
    )]
    DotenvParse { error_index: usize },

    /// Failed to read the `.env` file due to an I/O error.
    #[error("Failed to read .env file: {kind}")]
    DotenvIo { kind: ErrorKind },

    /// Unknown dotenv error (future variants from dotenvy crate).
    ///
    /// SAFETY: This error does not include any raw dotenv content.
    #[error("Failed to load .env file. Hint: set DOTENV_DISABLED=1 to skip .env loading")]
    DotenvUnknown,
}

impl ConfigError {
    /// True when strict decoding rejected the file because of unmatched keys.
    pub fn is_unmatched_keys(&self) -> bool {
        matches!(self, ConfigError::UnmatchedKeys { .. })
    }
}
