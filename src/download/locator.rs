//! Finding and reading back the file yt-dlp produced.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::download::error::DownloadError;

/// Extensions we accept as finished media.
pub const MEDIA_EXTENSIONS: [&str; 4] = ["mp4", "mp3", "webm", "mkv"];

/// The media file found in a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub extension: String,
    pub size: u64,
}

impl OutputFile {
    pub fn is_audio(&self) -> bool {
        self.extension == "mp3"
    }

    pub fn content_type(&self) -> &'static str {
        if self.is_audio() {
            "audio/mpeg"
        } else {
            "video/mp4"
        }
    }

    pub fn default_extension(&self) -> &'static str {
        if self.is_audio() {
            "mp3"
        } else {
            "mp4"
        }
    }
}

/// Bytes ready to hand to the client.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

impl MediaPayload {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

fn media_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    MEDIA_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Scan `dir` (non-recursively) for the produced media file.
///
/// Entries are visited in name order so the choice is deterministic. A
/// missing file is [`DownloadError::NoOutput`]; a zero-byte one is
/// [`DownloadError::EmptyOutput`].
pub async fn locate_output(dir: &Path) -> Result<OutputFile, DownloadError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(ext) = media_extension(&path) {
            candidates.push((path, ext, metadata.len()));
        }
    }
    candidates.sort();

    if candidates.len() > 1 {
        log::warn!(
            "{} media files in {}, using the first one",
            candidates.len(),
            dir.display()
        );
    }

    let (path, extension, size) = candidates.into_iter().next().ok_or(DownloadError::NoOutput)?;
    if size == 0 {
        return Err(DownloadError::EmptyOutput(path.display().to_string()));
    }

    Ok(OutputFile { path, extension, size })
}

/// Read the whole file into memory. Size is bounded by the builder's filters.
pub async fn read_output(file: &OutputFile) -> Result<MediaPayload, DownloadError> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| DownloadError::ReadOutput {
            path: file.path.display().to_string(),
            source,
        })?;

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    Ok(MediaPayload {
        bytes,
        content_type: file.content_type(),
        file_name: format!("download_{}.{}", millis, file.default_extension()),
    })
}

/// [`locate_output`] followed by [`read_output`].
pub async fn locate_and_read(dir: &Path) -> Result<MediaPayload, DownloadError> {
    let file = locate_output(dir).await?;
    log::info!("Found output {} ({} bytes)", file.path.display(), file.size);
    read_output(&file).await
}
