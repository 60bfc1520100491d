//! Error types for h2sweep.
//!
//! Uses `thiserror` for ergonomic error definitions. Per-address failures
//! (`ScanError::Dial`, `ScanError::Handshake`, ...) never abort a sweep; only
//! setup errors surface from the binary.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{AddressError, PortError};

/// Main error type for scanning operations.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{0}")]
    Dial(String),

    #[error("connection timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("{0}")]
    Handshake(String),

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker pool stopped before the queue was drained")]
    PoolStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by result sinks.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidFormat(e.to_string())
    }
}

/// Top-level error for the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
