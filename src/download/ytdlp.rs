//! Version probes for the external tools.

use std::time::Duration;

use crate::core::config::ExecLimits;
use crate::core::process::{Invocation, ToolRunner};
use crate::download::error::DownloadError;

/// Version output is tiny; anything larger is not a version string.
const VERSION_OUTPUT_LIMIT: usize = 64 * 1024;

async fn first_line_of(
    runner: &dyn ToolRunner,
    invocation: Invocation,
    timeout: Duration,
) -> Result<String, DownloadError> {
    let output = runner
        .run(&invocation, ExecLimits::new(timeout, VERSION_OUTPUT_LIMIT))
        .await?;

    output
        .stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DownloadError::NoMetadata(format!("{} printed no version", invocation.program)))
}

/// `yt-dlp --version`, trimmed.
pub async fn ytdlp_version(runner: &dyn ToolRunner, bin: &str, timeout: Duration) -> Result<String, DownloadError> {
    first_line_of(runner, Invocation::new(bin, ["--version"]), timeout).await
}

/// First line of `ffmpeg -version`, or `None` when ffmpeg is unusable.
pub async fn ffmpeg_version(runner: &dyn ToolRunner, bin: &str, timeout: Duration) -> Option<String> {
    match first_line_of(runner, Invocation::new(bin, ["-version"]), timeout).await {
        Ok(line) => Some(line),
        Err(e) => {
            log::warn!("ffmpeg probe failed: {}", e);
            None
        }
    }
}
