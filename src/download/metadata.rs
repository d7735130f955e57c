//! Metadata analysis via `yt-dlp --dump-json`.
//!
//! Runs yt-dlp without downloading, parses the JSON it prints and maps it
//! onto the [`VideoSummary`] returned by `/analyze`. Missing fields get
//! defaults instead of failing the analysis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::ExecLimits;
use crate::core::process::{Invocation, ToolRunner};
use crate::core::utils::{format_duration, format_file_size, truncate_chars};
use crate::core::validation::{MediaUrl, Platform};
use crate::download::error::DownloadError;

/// Descriptions longer than this are cut.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Subset of the `--dump-json` document we use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVideoInfo {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub formats: Option<Vec<RawFormat>>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
    pub description: Option<String>,
}

/// One entry of `formats`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    pub height: Option<u32>,
    pub ext: Option<String>,
    pub filesize: Option<f64>,
    pub filesize_approx: Option<f64>,
}

impl RawFormat {
    /// Exact size when known, otherwise the estimate, otherwise 0.
    fn size_bytes(&self) -> u64 {
        self.filesize
            .or(self.filesize_approx)
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(|s| s as u64)
            .unwrap_or(0)
    }
}

/// A quality choice offered to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    pub quality: String,
    pub format: String,
    pub size: String,
}

impl FormatOption {
    fn new(quality: &str, format: &str, size: &str) -> Self {
        Self {
            quality: quality.to_string(),
            format: format.to_string(),
            size: size.to_string(),
        }
    }

    fn audio() -> Self {
        Self::new("Audio", "mp3", "~3-5 MB")
    }
}

/// Body of a successful `/analyze` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
    pub platform: String,
    pub formats: Vec<FormatOption>,
    pub uploader: String,
    pub view_count: u64,
    pub upload_date: Option<String>,
    pub description: String,
}

/// Placeholder shown when yt-dlp reports no thumbnail.
pub fn placeholder_thumbnail(platform: Platform) -> &'static str {
    match platform {
        Platform::TikTok => "https://images.unsplash.com/photo-1611162617474-5b21e879e113?w=320&h=180&fit=crop",
        Platform::Facebook => "https://images.unsplash.com/photo-1611162618071-b39a2ec055fb?w=320&h=180&fit=crop",
        Platform::Instagram => "https://images.unsplash.com/photo-1611162617213-7d7a39e9b1d7?w=320&h=180&fit=crop",
        Platform::Twitter => "https://images.unsplash.com/photo-1611162618479-ee3d24aaef0b?w=320&h=180&fit=crop",
        Platform::Vimeo => "https://images.unsplash.com/photo-1574717024653-61fd2cf4d44d?w=320&h=180&fit=crop",
        _ => "https://images.unsplash.com/photo-1611162616305-c69b3fa7fbe0?w=320&h=180&fit=crop",
    }
}

/// Used when yt-dlp lists no format with a known height.
fn placeholder_catalog() -> Vec<FormatOption> {
    vec![
        FormatOption::new("1080p", "mp4", "~50 MB"),
        FormatOption::new("720p", "mp4", "~30 MB"),
        FormatOption::new("480p", "mp4", "~20 MB"),
        FormatOption::new("Audio", "mp3", "~3 MB"),
    ]
}

/// One option per height, largest known size wins, highest first, audio last.
pub fn extract_formats(formats: &[RawFormat]) -> Vec<FormatOption> {
    let mut by_height: BTreeMap<u32, (u64, &str)> = BTreeMap::new();

    for format in formats {
        let Some(height) = format.height.filter(|h| *h > 0) else {
            continue;
        };
        let size = format.size_bytes();
        let ext = format.ext.as_deref().unwrap_or("mp4");
        let replace = match by_height.get(&height) {
            Some((best, _)) => size > *best,
            None => true,
        };
        if replace {
            by_height.insert(height, (size, ext));
        }
    }

    if by_height.is_empty() {
        return placeholder_catalog();
    }

    let mut options: Vec<FormatOption> = by_height
        .into_iter()
        .rev()
        .map(|(height, (size, ext))| FormatOption {
            quality: format!("{}p", height),
            format: ext.to_string(),
            size: format_file_size(size),
        })
        .collect();
    options.push(FormatOption::audio());
    options
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Map the raw document onto the response shape.
pub fn summarize(info: RawVideoInfo, platform: Platform) -> VideoSummary {
    VideoSummary {
        title: non_empty(info.title).unwrap_or_else(|| "Unknown Title".to_string()),
        thumbnail: non_empty(info.thumbnail).unwrap_or_else(|| placeholder_thumbnail(platform).to_string()),
        duration: format_duration(info.duration),
        platform: platform.as_str().to_string(),
        formats: extract_formats(info.formats.as_deref().unwrap_or_default()),
        uploader: non_empty(info.uploader).unwrap_or_else(|| "Unknown".to_string()),
        view_count: info.view_count.unwrap_or(0),
        upload_date: non_empty(info.upload_date),
        description: info
            .description
            .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS))
            .unwrap_or_default(),
    }
}

/// Parse `--dump-json` output. Playlists print one document per line; the
/// first one is used.
pub fn parse_dump(stdout: &str) -> Result<RawVideoInfo, DownloadError> {
    let mut stream = serde_json::Deserializer::from_str(stdout).into_iter::<RawVideoInfo>();
    match stream.next() {
        Some(info) => Ok(info?),
        None => Err(DownloadError::NoMetadata("yt-dlp printed no metadata".to_string())),
    }
}

/// `yt-dlp --dump-json` invocation for a URL.
pub fn analyze_invocation(bin: &str, media: &MediaUrl) -> Invocation {
    Invocation::new(
        bin,
        ["--dump-json", "--no-download", "--no-warnings", "--", media.as_str()],
    )
}

/// Fetch and summarize metadata for a validated URL.
pub async fn analyze(
    runner: &dyn ToolRunner,
    bin: &str,
    media: &MediaUrl,
    limits: ExecLimits,
) -> Result<VideoSummary, DownloadError> {
    let invocation = analyze_invocation(bin, media);
    log::info!("Analyzing {}: {}", media.platform, invocation.display());

    let output = runner.run(&invocation, limits).await?;
    if output.stdout.trim().is_empty() && !output.stderr.trim().is_empty() {
        return Err(DownloadError::NoMetadata(output.stderr));
    }

    let info = parse_dump(&output.stdout)?;
    Ok(summarize(info, media.platform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::validate_media_url;
    use crate::testing::{ScriptedRunner, Step};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const MB: f64 = 1024.0 * 1024.0;

    fn format(height: Option<u32>, size: Option<f64>) -> RawFormat {
        RawFormat {
            height,
            ext: Some("mp4".into()),
            filesize: size,
            filesize_approx: None,
        }
    }

    #[test]
    fn test_dedup_keeps_largest_variant() {
        let formats = [
            format(Some(720), Some(10.0 * MB)),
            format(Some(720), Some(12.0 * MB)),
            format(Some(480), Some(5.0 * MB)),
        ];

        let options = extract_formats(&formats);
        assert_eq!(
            options,
            vec![
                FormatOption::new("720p", "mp4", "12.0 MB"),
                FormatOption::new("480p", "mp4", "5.0 MB"),
                FormatOption::new("Audio", "mp3", "~3-5 MB"),
            ]
        );
    }

    #[test]
    fn test_unknown_size_does_not_replace_known() {
        let formats = [format(Some(1080), Some(40.0 * MB)), format(Some(1080), None)];
        assert_eq!(extract_formats(&formats)[0].size, "40.0 MB");

        let formats = [format(Some(1080), None), format(Some(1080), Some(40.0 * MB))];
        assert_eq!(extract_formats(&formats)[0].size, "40.0 MB");
    }

    #[test]
    fn test_approx_size_used_when_exact_missing() {
        let mut f = format(Some(360), None);
        f.filesize_approx = Some(2.0 * MB);
        assert_eq!(extract_formats(&[f])[0].size, "2.0 MB");
    }

    #[test]
    fn test_audio_only_formats_use_catalog() {
        let options = extract_formats(&[format(None, Some(MB))]);
        assert_eq!(options, placeholder_catalog());
        assert_eq!(extract_formats(&[]).len(), 4);
    }

    #[test]
    fn test_summarize_defaults() {
        let summary = summarize(RawVideoInfo::default(), Platform::TikTok);
        assert_eq!(summary.title, "Unknown Title");
        assert_eq!(summary.thumbnail, placeholder_thumbnail(Platform::TikTok));
        assert_eq!(summary.duration, "Unknown");
        assert_eq!(summary.platform, "tiktok");
        assert_eq!(summary.uploader, "Unknown");
        assert_eq!(summary.view_count, 0);
        assert_eq!(summary.upload_date, None);
        assert_eq!(summary.description, "");
    }

    #[test]
    fn test_unlisted_platform_thumbnail_defaults_to_youtube() {
        assert_eq!(
            placeholder_thumbnail(Platform::Reddit),
            placeholder_thumbnail(Platform::YouTube)
        );
    }

    #[test]
    fn test_description_truncated() {
        let info = RawVideoInfo {
            description: Some("é".repeat(250)),
            ..Default::default()
        };
        assert_eq!(summarize(info, Platform::YouTube).description.chars().count(), 200);
    }

    #[test]
    fn test_parse_dump_takes_first_document() {
        let info = parse_dump("{\"title\":\"one\"}\n{\"title\":\"two\"}\n").unwrap();
        assert_eq!(info.title.as_deref(), Some("one"));
        assert!(matches!(parse_dump("not json"), Err(DownloadError::Parse(_))));
    }

    #[tokio::test]
    async fn test_analyze_runs_dump_json() {
        let json = r#"{
            "title": "Clip",
            "duration": 75,
            "uploader": "someone",
            "view_count": 42,
            "upload_date": "20240101",
            "formats": [{"height": 720, "ext": "mp4", "filesize": 1048576}, {"height": null, "ext": "m4a"}]
        }"#;
        let runner = ScriptedRunner::new([Step::stdout(json)]);
        let media = validate_media_url("https://youtu.be/abc").unwrap();
        let limits = ExecLimits::new(Duration::from_secs(30), 1024 * 1024);

        let summary = analyze(&runner, "yt-dlp", &media, limits).await.unwrap();

        assert_eq!(summary.title, "Clip");
        assert_eq!(summary.duration, "1:15");
        assert_eq!(summary.view_count, 42);
        assert_eq!(summary.upload_date.as_deref(), Some("20240101"));
        assert_eq!(summary.formats.len(), 2);

        let calls = runner.calls();
        assert_eq!(calls[0].limits, limits);
        assert!(calls[0].invocation.args.contains(&"--dump-json".to_string()));
        assert!(calls[0].invocation.args.contains(&"--no-download".to_string()));
        assert_eq!(calls[0].invocation.args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[tokio::test]
    async fn test_analyze_propagates_tool_failure() {
        let runner = ScriptedRunner::new([Step::fail("ERROR: [youtube] abc: Video unavailable")]);
        let media = validate_media_url("https://www.youtube.com/watch?v=abc").unwrap();
        let limits = ExecLimits::new(Duration::from_secs(30), 1024);

        let err = analyze(&runner, "yt-dlp", &media, limits).await.unwrap_err();
        assert!(err.diagnostic_text().contains("Video unavailable"));
    }
}
