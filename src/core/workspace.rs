//! Per-request temporary directories.
//!
//! Each download gets its own directory `<temp_root>/<uuid>`. The directory is
//! removed exactly once: by [`WorkspaceManager::release`] on the normal path,
//! or by the `Drop` impl if the owning task never got that far.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Allocates and removes workspaces under a fixed root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

/// A uniquely named directory owned by a single request.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh workspace directory.
    ///
    /// Failure here (permissions, disk full) is fatal for the request.
    pub async fn acquire(&self) -> std::io::Result<Workspace> {
        let id = Uuid::new_v4();
        let dir = self.root.join(id.to_string());
        fs_err::tokio::create_dir_all(&dir).await?;
        log::debug!("Workspace {} created at {}", id, dir.display());
        Ok(Workspace {
            id,
            dir,
            released: false,
        })
    }

    /// Recursively delete the workspace.
    ///
    /// Errors are logged and swallowed so they never replace the response or
    /// error the caller is already returning.
    pub async fn release(&self, mut workspace: Workspace) {
        workspace.released = true;
        match fs_err::tokio::remove_dir_all(&workspace.dir).await {
            Ok(()) => log::debug!("Workspace {} removed", workspace.id),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::error!("Workspace cleanup failed: {}", e),
        }
    }

    /// Run `f` inside a fresh workspace and release it afterwards, whatever `f` returned.
    pub async fn scoped<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: From<std::io::Error>,
    {
        let workspace = self.acquire().await?;
        let result = f(workspace.path().to_path_buf()).await;
        self.release(workspace).await;
        result
    }
}

/// Remove everything inside `dir`, keeping the directory itself.
pub async fn clear_directory(dir: &Path) -> std::io::Result<()> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            fs_err::tokio::remove_dir_all(&path).await?;
        } else {
            fs_err::tokio::remove_file(&path).await?;
        }
    }
    Ok(())
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Task was cancelled or panicked before release(); clean up synchronously.
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::error!("Workspace {} cleanup on drop failed: {}", self.id, e);
            }
        }
    }
}
