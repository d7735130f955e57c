use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::validation::ValidationError;
use crate::download::error::DownloadError;

/// Centralized error types for the application
///
/// Every layer has its own error enum; they all convert into this one at the
/// transport edge (HTTP handlers, CLI commands).
///
/// # Example
///
/// ```no_run
/// use vidfetch::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Rejected input (missing or unsupported URL)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Download / analysis pipeline errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// True for errors caused by the caller's input rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
