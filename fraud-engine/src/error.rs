//! Error types for the fraud engine

use thiserror::Error;

/// Fraud engine error
#[derive(Debug, Error)]
pub enum Error {
    /// No alert exists with the given id
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    /// Alert already resolved or marked as false positive
    #[error("Alert already closed: {0}")]
    AlertClosed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Alert store failure
    #[error("Alert store error: {0}")]
    Store(String),

    /// Metrics registration failure
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// No async runtime to run the alert worker on
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
