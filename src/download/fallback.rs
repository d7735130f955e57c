//! Fallback policy for downloads.
//!
//! The primary command runs first. If it times out or floods its output
//! ceiling, the workspace is emptied and the reduced-quality command runs
//! once with the tighter fallback limits. Any other failure is returned
//! as-is, and a failed fallback is final.

use std::fmt;
use std::path::Path;

use crate::core::config::{AppConfig, ExecLimits};
use crate::core::process::{ExecOutput, ToolRunner};
use crate::core::workspace::clear_directory;
use crate::download::builder::{build_command, build_fallback_command, DownloadRequest, YtDlpCommand};
use crate::download::error::DownloadError;

/// Which command produced the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Primary,
    Fallback,
}

impl Attempt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attempt::Primary => "primary",
            Attempt::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits for both attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub primary: ExecLimits,
    pub fallback: ExecLimits,
}

impl FallbackPolicy {
    pub fn new(primary: ExecLimits, fallback: ExecLimits) -> Self {
        Self { primary, fallback }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.download, config.fallback)
    }
}

/// Result of a successful attempt.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub attempt: Attempt,
    pub command: YtDlpCommand,
    pub output: ExecOutput,
}

/// Run the primary command in `workdir`, falling back at most once.
pub async fn execute_with_fallback(
    runner: &dyn ToolRunner,
    bin: &str,
    request: &DownloadRequest,
    workdir: &Path,
    policy: &FallbackPolicy,
) -> Result<AttemptOutcome, DownloadError> {
    let primary = build_command(request);
    let invocation = primary.invocation(bin, workdir);
    log::info!("Running: {}", invocation.display());

    let err = match runner.run(&invocation, policy.primary).await {
        Ok(output) => {
            log::debug!("yt-dlp stdout: {}", output.stdout);
            return Ok(AttemptOutcome {
                attempt: Attempt::Primary,
                command: primary,
                output,
            });
        }
        Err(e) if e.is_resource_exhaustion() => e,
        Err(e) => return Err(e.into()),
    };

    log::warn!(
        "Primary download for {} failed ({}), retrying at reduced quality",
        request.media.as_str(),
        err
    );

    // Partial or intermediate files from the primary must not be picked up later.
    if let Err(e) = clear_directory(workdir).await {
        log::warn!("Failed to clear {} before fallback: {}", workdir.display(), e);
    }

    let fallback = build_fallback_command(request);
    let invocation = fallback.invocation(bin, workdir);
    log::info!("Running fallback: {}", invocation.display());

    let output = runner.run(&invocation, policy.fallback).await.map_err(|e| {
        log::error!("Fallback download for {} failed: {}", request.media.as_str(), e);
        DownloadError::from(e)
    })?;
    log::debug!("yt-dlp stdout: {}", output.stdout);

    Ok(AttemptOutcome {
        attempt: Attempt::Fallback,
        command: fallback,
        output,
    })
}
