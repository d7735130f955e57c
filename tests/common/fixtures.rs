//! Test fixtures for pipeline and HTTP tests
//!
//! Provides TestEnvironment: a temp workspace root, a scripted yt-dlp and
//! the service/router wired to both.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;
use vidfetch::core::config::{AppConfig, ExecLimits};
use vidfetch::core::web_server::router;
use vidfetch::download::MediaService;
use vidfetch::testing::{ScriptedRunner, Step};

/// Complete test environment
///
/// # Example
/// ```ignore
/// let env = TestEnvironment::new([Step::succeed_with_file("a.mp4", b"x")]);
/// let outcome = env.service.download(&request).await?;
/// assert_eq!(env.workspace_count(), 0);
/// ```
pub struct TestEnvironment {
    /// Root under which workspaces are created
    pub temp_root: TempDir,

    /// Scripted yt-dlp
    pub runner: Arc<ScriptedRunner>,

    /// Service under test
    pub service: MediaService,
}

/// Limits small enough to tell primary and fallback apart in assertions.
pub fn test_config(root: &Path) -> AppConfig {
    AppConfig {
        temp_root: root.to_path_buf(),
        download: ExecLimits::new(Duration::from_secs(180), 500 * 1024 * 1024),
        fallback: ExecLimits::new(Duration::from_secs(120), 100 * 1024 * 1024),
        ..Default::default()
    }
}

impl TestEnvironment {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let temp_root = tempfile::tempdir().expect("create temp root");
        let runner = Arc::new(ScriptedRunner::new(steps));
        let service = MediaService::new(test_config(temp_root.path()), runner.clone());
        Self {
            temp_root,
            runner,
            service,
        }
    }

    /// Environment whose runner fails every call.
    pub fn idle() -> Self {
        Self::new(Vec::<Step>::new())
    }

    pub fn router(&self) -> Router {
        router(self.service.clone())
    }

    /// Number of workspace directories still present under the root.
    pub fn workspace_count(&self) -> usize {
        std::fs::read_dir(self.temp_root.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
