//! Download management and processing

pub mod builder;
pub mod error;
pub mod fallback;
pub mod locator;
pub mod metadata;
pub mod pipeline;
pub mod ytdlp;
pub mod ytdlp_errors;

// Re-exports for convenience
pub use builder::{build_command, build_fallback_command, CommandBuilder, DownloadOptions, DownloadRequest};
pub use error::DownloadError;
pub use fallback::Attempt;
pub use metadata::VideoSummary;
pub use pipeline::MediaService;
