//! Error handling module
//!
//! Provides the unified error type for a census run. Every failure that can
//! end a run is one variant here, and each variant carries its own process
//! exit code.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed storage file {}: {source}", .path.display())]
    MalformedStorage {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage I/O error on {}: {source}", .path.display())]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Census failed: {0}")]
    Census(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

impl AppError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::MalformedStorage { .. } | AppError::StorageIo { .. } => 3,
            AppError::Connection(_) => 4,
            AppError::Census(_) => 5,
            AppError::Delivery(_) => 6,
        }
    }
}

/// Result type alias for run stages
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a census error
pub fn census_error(msg: impl Into<String>) -> AppError {
    AppError::Census(msg.into())
}

/// Helper function to create a delivery error
pub fn delivery_error(msg: impl Into<String>) -> AppError {
    AppError::Delivery(msg.into())
}
