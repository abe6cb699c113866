//! Error types for rtpanel
//!
//! Every layer reports failures through this one enum.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Classification text for a failed `up` during start
pub const START_FAILED: &str = "runtime start failed";

/// Classification text for a failed image build
pub const BUILD_FAILED: &str = "image build failed";

/// Classification text for any other failed compose operation
pub const OPERATION_FAILED: &str = "runtime operation failed";

/// rtpanel error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Storage
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Provisioning
    // ========================================================================
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Staging failed at {}: {}", .path.display(), .message)]
    Staging { path: PathBuf, message: String },

    #[error("Env file error: {0}")]
    EnvFile(String),

    // ========================================================================
    // External processes and engines
    // ========================================================================
    #[error("{}:{}", OPERATION_FAILED, .stderr)]
    Compose { verb: String, stderr: String },

    #[error("Docker error: {0}")]
    Docker(String),

    #[error("Install operation failed for {install_id}: {message}")]
    Install { install_id: u64, message: String },

    #[error("Task error: {0}")]
    Task(String),

    // ========================================================================
    // General
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // Conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Staging error helper
    pub fn staging(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Staging {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Raw stderr captured from a failed compose operation, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::Compose { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Render as `<classification>:<detail>`.
    ///
    /// Compose failures contribute their raw stderr, anything else its display form.
    pub fn classified(&self, classification: &str) -> String {
        match self.stderr() {
            Some(stderr) => format!("{}:{}", classification, stderr),
            None => format!("{}:{}", classification, self),
        }
    }

    /// Errors raised before anything was staged on disk
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::TemplateNotFound(_) | Error::InvalidInput(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
