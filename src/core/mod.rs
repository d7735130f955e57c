//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod process;
pub mod utils;
pub mod validation;
pub mod web_server;
pub mod workspace;

// Re-exports for convenience
pub use config::{AppConfig, ExecLimits};
pub use error::{AppError, AppResult};
pub use logging::init_logger;
