use thiserror::Error;

use crate::core::process::ExecError;

/// Structured error type for download and analysis operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Could not create the per-request workspace
    #[error("Failed to prepare workspace: {0}")]
    Workspace(#[from] std::io::Error),

    /// yt-dlp failed to start, timed out, overflowed, or exited non-zero
    #[error("yt-dlp failed: {0}")]
    Exec(#[from] ExecError),

    /// Process reported success but left no media file behind
    #[error("Download failed - no output file found")]
    NoOutput,

    /// The media file exists but is zero bytes
    #[error("Download failed - empty file: {0}")]
    EmptyOutput(String),

    /// Reading the produced file back failed
    #[error("Failed to read output file {path}: {source}")]
    ReadOutput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// `--dump-json` produced something that is not the expected JSON
    #[error("Failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    /// `--dump-json` printed nothing but complained on stderr
    #[error("yt-dlp error: {0}")]
    NoMetadata(String),

    /// The pipeline task itself died
    #[error("Download task failed: {0}")]
    Task(String),
}

impl DownloadError {
    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::Workspace(_) => "workspace",
            DownloadError::Exec(ExecError::Timeout(_)) => "timeout",
            DownloadError::Exec(ExecError::OutputOverflow { .. }) => "overflow",
            DownloadError::Exec(_) => "ytdlp",
            DownloadError::NoOutput | DownloadError::EmptyOutput(_) => "no_output",
            DownloadError::ReadOutput { .. } => "read_output",
            DownloadError::Parse(_) => "parse",
            DownloadError::NoMetadata(_) => "no_metadata",
            DownloadError::Task(_) => "task",
        }
    }

    /// Text the substring classifier looks at: tool stderr when there is one,
    /// otherwise the error's own message.
    pub fn diagnostic_text(&self) -> String {
        match self {
            DownloadError::Exec(ExecError::Failed { stderr, stdout, .. }) => {
                if stderr.trim().is_empty() {
                    stdout.clone()
                } else {
                    stderr.clone()
                }
            }
            DownloadError::NoMetadata(stderr) => stderr.clone(),
            other => other.to_string(),
        }
    }
}
