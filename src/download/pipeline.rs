//! Download and analysis orchestration.
//!
//! [`MediaService`] is the single entry point shared by the HTTP server and
//! the CLI:
//!   workspace acquire → primary command → (fallback) → locate output → read → workspace release
//!
//! The workspace is released on every path out of [`MediaService::download`].

use std::path::Path;
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::process::{ProcessRunner, ToolRunner};
use crate::core::validation::MediaUrl;
use crate::core::workspace::WorkspaceManager;
use crate::download::builder::DownloadRequest;
use crate::download::error::DownloadError;
use crate::download::fallback::{execute_with_fallback, Attempt, FallbackPolicy};
use crate::download::locator::{locate_and_read, MediaPayload};
use crate::download::metadata::{self, VideoSummary};
use crate::download::ytdlp;

/// A finished download.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub payload: MediaPayload,
    pub attempt: Attempt,
}

/// Tool availability, as reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub version: String,
    pub ffmpeg: Option<String>,
}

/// Runs yt-dlp on behalf of requests.
#[derive(Clone)]
pub struct MediaService {
    runner: Arc<dyn ToolRunner>,
    config: Arc<AppConfig>,
    workspaces: WorkspaceManager,
}

impl MediaService {
    pub fn new(config: AppConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let workspaces = WorkspaceManager::new(config.temp_root.clone());
        Self {
            runner,
            config: Arc::new(config),
            workspaces,
        }
    }

    /// Service backed by real child processes.
    pub fn with_process_runner(config: AppConfig) -> Self {
        Self::new(config, Arc::new(ProcessRunner::new()))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn temp_root(&self) -> &Path {
        self.workspaces.root()
    }

    /// Metadata for a validated URL. No workspace is needed.
    pub async fn analyze(&self, media: &MediaUrl) -> Result<VideoSummary, DownloadError> {
        metadata::analyze(self.runner.as_ref(), &self.config.ytdlp_bin, media, self.config.analyze).await
    }

    /// Download into a fresh workspace and read the result into memory.
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadOutcome, DownloadError> {
        let policy = FallbackPolicy::from_config(&self.config);
        let runner = self.runner.as_ref();
        let bin = self.config.ytdlp_bin.as_str();

        self.workspaces
            .scoped(|dir| async move {
                let outcome = execute_with_fallback(runner, bin, request, &dir, &policy).await?;
                let payload = locate_and_read(&dir).await?;
                log::info!(
                    "Downloaded {} ({} bytes, {} attempt)",
                    request.media.as_str(),
                    payload.bytes.len(),
                    outcome.attempt
                );
                Ok(DownloadOutcome {
                    payload,
                    attempt: outcome.attempt,
                })
            })
            .await
    }

    /// Probe yt-dlp (required) and ffmpeg (informational).
    pub async fn health(&self) -> Result<HealthReport, DownloadError> {
        let timeout = self.config.health_timeout;
        let version = ytdlp::ytdlp_version(self.runner.as_ref(), &self.config.ytdlp_bin, timeout).await?;
        let ffmpeg = ytdlp::ffmpeg_version(self.runner.as_ref(), &self.config.ffmpeg_bin, timeout).await;
        Ok(HealthReport { version, ffmpeg })
    }
}
