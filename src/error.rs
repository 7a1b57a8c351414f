//! Error types for zuora-toolkit
//!
//! This module provides the error taxonomy for the library:
//! - Authentication and session failures
//! - Configuration validation (batch sizes, endpoints, session length)
//! - Export pipeline failures (submission, timeout, failed job)
//! - Download and parse failures for exported files
//! - Stable machine-readable error codes for each variant

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for zuora-toolkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for zuora-toolkit
///
/// Callers can always tell "no file was produced" (`ExportSubmission`,
/// `ExportTimeout`, `ExportFailed`) apart from "the transport failed"
/// (`Transport`, `Network`, `Download`) and "the file could not be read"
/// (`Parse`).
#[derive(Debug, Error)]
pub enum Error {
    /// Login failed or the login response was missing session fields
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Invalid configuration or argument, raised at the point of misconfiguration
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description of the invalid value
        message: String,
        /// The setting or argument that was rejected (e.g., "batch_size")
        key: Option<String>,
    },

    /// The remote service rejected creation of an export job
    #[error("export submission failed: {0}")]
    ExportSubmission(String),

    /// The export job did not complete within the allowed number of polls
    #[error("export {export_id} did not complete after {tries} tries")]
    ExportTimeout {
        /// Remote identifier of the export job
        export_id: String,
        /// Number of status polls performed
        tries: u32,
    },

    /// The export job reached a terminal failure state on the server
    #[error("export {export_id} ended with status {status}")]
    ExportFailed {
        /// Remote identifier of the export job
        export_id: String,
        /// Status reported by the server (e.g., "Failed", "Cancelled")
        status: String,
    },

    /// Export file download failed
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Exported file could not be parsed as delimited text
    #[error("cannot read export {file_id}: {reason}")]
    Parse {
        /// File identifier of the export being parsed
        file_id: String,
        /// Parser error message
        reason: String,
    },

    /// The SOAP transport reported a failure
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP error while talking to the file endpoint
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Export file download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The file endpoint answered with a non-success status
    #[error("download of {file_id} failed with HTTP {status}")]
    Status {
        /// File identifier that was requested
        file_id: String,
        /// HTTP status code returned by the server
        status: u16,
    },

    /// A persisted file could not be written or backed up
    #[error("failed to write export to {path}: {reason}")]
    WriteFailed {
        /// The path that could not be written
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },
}

impl Error {
    /// Create a validation error for a named setting
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            Error::Authentication(_) => "authentication_error",
            Error::Validation { .. } => "validation_error",
            Error::ExportSubmission(_) => "export_submission_error",
            Error::ExportTimeout { .. } => "export_timeout",
            Error::ExportFailed { .. } => "export_failed",
            Error::Download(e) => match e {
                DownloadError::Status { .. } => "download_status_error",
                DownloadError::WriteFailed { .. } => "download_write_failed",
            },
            Error::Parse { .. } => "parse_error",
            Error::Transport(_) => "transport_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// True when the error means the export produced no file
    pub fn is_export_unavailable(&self) -> bool {
        matches!(
            self,
            Error::ExportSubmission(_) | Error::ExportTimeout { .. } | Error::ExportFailed { .. }
        )
    }
}
