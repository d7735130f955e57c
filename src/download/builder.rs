//! yt-dlp command construction.
//!
//! Turns a validated [`DownloadRequest`] into the argument vector for a
//! primary attempt and for a cheaper fallback attempt. Building never fails:
//! unparseable quality strings fall back to [`DEFAULT_HEIGHT`].

use std::fmt;
use std::path::Path;

use crate::core::process::Invocation;
use crate::core::validation::{validate_media_url, MediaUrl, Platform, ValidationError};

/// Quality tier used when the format identifier carries none we can read.
pub const DEFAULT_HEIGHT: u32 = 720;

/// Ceiling used by the "best" selector chain.
pub const BEST_MAX_HEIGHT: u32 = 1080;

/// The fallback never targets more than this.
pub const FALLBACK_MAX_HEIGHT: u32 = 480;

/// Known quality tiers, highest first.
const HEIGHT_LADDER: [u32; 8] = [2160, 1440, 1080, 720, 480, 360, 240, 144];

/// User-chosen download options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Composite format identifier, e.g. "mp4-720p" or "best"
    pub format: String,
    pub audio_only: bool,
    pub remove_watermark: bool,
}

/// A download request whose URL already passed the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub media: MediaUrl,
    pub options: DownloadOptions,
}

impl DownloadRequest {
    /// Validate the URL and attach the options.
    pub fn new(url: &str, options: DownloadOptions) -> Result<Self, ValidationError> {
        Ok(Self {
            media: validate_media_url(url)?,
            options,
        })
    }

    pub fn platform(&self) -> Platform {
        self.media.platform
    }
}

/// Requested video ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTarget {
    /// No explicit tier; use the size-aware "best" chain
    Best,
    /// Height must not exceed this many pixels
    MaxHeight(u32),
}

impl QualityTarget {
    /// Parse the tier out of a composite identifier ("mp4-720p" → 720).
    ///
    /// The tier is the second `-`-separated token. A missing token means
    /// [`DEFAULT_HEIGHT`]; so does one that is not a positive number.
    pub fn parse(format: &str) -> Self {
        let format = format.trim();
        if format.is_empty() || format.eq_ignore_ascii_case("best") {
            return QualityTarget::Best;
        }

        let height = format
            .split('-')
            .nth(1)
            .map(|token| token.trim().trim_end_matches(['p', 'P']))
            .and_then(|token| token.parse::<u32>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_HEIGHT);

        QualityTarget::MaxHeight(height)
    }

    /// Highest height this target can produce.
    pub fn ceiling(&self) -> u32 {
        match self {
            QualityTarget::Best => BEST_MAX_HEIGHT,
            QualityTarget::MaxHeight(h) => *h,
        }
    }

    /// Ceiling for the fallback attempt: the next tier down, capped at
    /// [`FALLBACK_MAX_HEIGHT`].
    pub fn fallback_height(&self) -> u32 {
        let ceiling = self.ceiling();
        HEIGHT_LADDER
            .iter()
            .copied()
            .find(|tier| *tier < ceiling)
            .unwrap_or(ceiling)
            .min(FALLBACK_MAX_HEIGHT)
    }
}

/// One alternative in a `/`-separated format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormatAlt {
    base: &'static str,
    max_height: Option<u32>,
    max_size_mb: Option<u32>,
    ext: Option<&'static str>,
}

impl FormatAlt {
    const fn new(base: &'static str) -> Self {
        Self {
            base,
            max_height: None,
            max_size_mb: None,
            ext: None,
        }
    }

    const fn height(mut self, h: u32) -> Self {
        self.max_height = Some(h);
        self
    }

    const fn size_mb(mut self, mb: u32) -> Self {
        self.max_size_mb = Some(mb);
        self
    }

    const fn ext(mut self, ext: &'static str) -> Self {
        self.ext = Some(ext);
        self
    }

    fn without_size(mut self) -> Self {
        self.max_size_mb = None;
        self
    }
}

impl fmt::Display for FormatAlt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base)?;
        if let Some(h) = self.max_height {
            write!(f, "[height<={}]", h)?;
        }
        if let Some(mb) = self.max_size_mb {
            write!(f, "[filesize<{}M]", mb)?;
        }
        if let Some(ext) = self.ext {
            write!(f, "[ext={}]", ext)?;
        }
        Ok(())
    }
}

/// Join alternatives, optionally dropping size filters. Duplicates created by
/// the stripping are removed, keeping the first occurrence.
fn selector(alts: &[FormatAlt], keep_size_limits: bool) -> String {
    let mut seen: Vec<FormatAlt> = Vec::with_capacity(alts.len());
    for alt in alts {
        let alt = if keep_size_limits { *alt } else { alt.without_size() };
        if !seen.contains(&alt) {
            seen.push(alt);
        }
    }
    seen.iter().map(ToString::to_string).collect::<Vec<_>>().join("/")
}

/// Flags appended to every invocation.
struct Robustness {
    socket_timeout_secs: u32,
    retries: u32,
    fragment_retries: u32,
    concurrent_fragments: u32,
}

const PRIMARY_ROBUSTNESS: Robustness = Robustness {
    socket_timeout_secs: 30,
    retries: 2,
    fragment_retries: 2,
    concurrent_fragments: 3,
};

const FALLBACK_ROBUSTNESS: Robustness = Robustness {
    socket_timeout_secs: 20,
    retries: 1,
    fragment_retries: 1,
    concurrent_fragments: 3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Primary,
    Fallback,
}

/// An immutable yt-dlp argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YtDlpCommand {
    args: Vec<String>,
}

impl YtDlpCommand {
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether `flag` appears as an argument.
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Value following the first occurrence of `flag`.
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// All values following occurrences of `flag`.
    pub fn arg_values<'a>(&'a self, flag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.args
            .windows(2)
            .filter(move |pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
    }

    /// The `--format` selector expression.
    pub fn format_selector(&self) -> Option<&str> {
        self.arg_value("--format")
    }

    /// Bind to a binary and a working directory.
    pub fn invocation(&self, bin: &str, cwd: &Path) -> Invocation {
        Invocation::new(bin, self.args.iter().cloned()).current_dir(cwd)
    }
}

/// Builds primary and fallback commands for one request.
///
/// # Example
///
/// ```
/// use vidfetch::download::builder::{CommandBuilder, DownloadOptions, DownloadRequest};
///
/// let request = DownloadRequest::new(
///     "https://www.youtube.com/watch?v=abc",
///     DownloadOptions { format: "mp4-720p".into(), ..Default::default() },
/// ).unwrap();
///
/// let primary = CommandBuilder::primary(&request).build();
/// assert!(primary.format_selector().unwrap().starts_with("best[height<=720]"));
/// ```
pub struct CommandBuilder<'a> {
    request: &'a DownloadRequest,
    tier: Tier,
}

impl<'a> CommandBuilder<'a> {
    pub fn primary(request: &'a DownloadRequest) -> Self {
        Self {
            request,
            tier: Tier::Primary,
        }
    }

    pub fn fallback(request: &'a DownloadRequest) -> Self {
        Self {
            request,
            tier: Tier::Fallback,
        }
    }

    pub fn build(self) -> YtDlpCommand {
        let options = &self.request.options;
        let platform = self.request.platform();
        // TikTok files are small; size filters only cost matches there.
        let keep_size_limits = platform != Platform::TikTok;

        let title_len = match self.tier {
            Tier::Primary => 50,
            Tier::Fallback => 30,
        };

        let mut args: Vec<String> = vec!["-o".into(), format!("%(title).{}s.%(ext)s", title_len)];

        if options.audio_only {
            let (quality, selector) = match self.tier {
                Tier::Primary => ("192K", "bestaudio[abr<=320]/bestaudio/best"),
                Tier::Fallback => ("128K", "worstaudio[abr<=128]/worstaudio/worst"),
            };
            push_all(
                &mut args,
                [
                    "--extract-audio",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    quality,
                    "--format",
                    selector,
                ],
            );
        } else {
            let target = QualityTarget::parse(&options.format);
            let alts = match self.tier {
                Tier::Primary => primary_video_alts(target),
                Tier::Fallback => fallback_video_alts(target),
            };
            args.push("--format".into());
            args.push(selector(&alts, keep_size_limits));
            push_all(&mut args, ["--merge-output-format", "mp4"]);
        }

        push_platform_args(&mut args, platform, options.remove_watermark);

        let robustness = match self.tier {
            Tier::Primary => PRIMARY_ROBUSTNESS,
            Tier::Fallback => FALLBACK_ROBUSTNESS,
        };
        push_robustness_args(&mut args, &robustness);

        args.push("--".into());
        args.push(self.request.media.as_str().to_string());

        YtDlpCommand { args }
    }
}

fn primary_video_alts(target: QualityTarget) -> Vec<FormatAlt> {
    match target {
        QualityTarget::MaxHeight(h) => vec![
            FormatAlt::new("best").height(h).size_mb(200),
            FormatAlt::new("best").height(h).size_mb(100),
            FormatAlt::new("best").height(h),
            FormatAlt::new("best").size_mb(100),
            FormatAlt::new("worst"),
        ],
        QualityTarget::Best => vec![
            FormatAlt::new("best").height(BEST_MAX_HEIGHT).size_mb(200),
            FormatAlt::new("best").height(720).size_mb(100),
            FormatAlt::new("best").size_mb(100),
            FormatAlt::new("best").height(720),
            FormatAlt::new("worst"),
        ],
    }
}

fn fallback_video_alts(target: QualityTarget) -> Vec<FormatAlt> {
    vec![
        FormatAlt::new("worst").height(target.fallback_height()).size_mb(50),
        FormatAlt::new("worst").ext("mp4"),
        FormatAlt::new("worst"),
    ]
}

fn push_platform_args(args: &mut Vec<String>, platform: Platform, remove_watermark: bool) {
    match platform {
        Platform::TikTok => {
            if remove_watermark {
                push_all(args, ["--extractor-args", "tiktok:watermark=false"]);
            }
        }
        Platform::YouTube => push_all(
            args,
            [
                "--no-warnings",
                "--no-playlist",
                "--extractor-args",
                "youtube:player_client=web",
            ],
        ),
        Platform::Instagram => push_all(args, ["--no-warnings"]),
        _ => {}
    }
}

fn push_robustness_args(args: &mut Vec<String>, r: &Robustness) {
    push_all(args, ["--no-check-certificate", "--prefer-ffmpeg"]);
    args.extend([
        "--socket-timeout".to_string(),
        r.socket_timeout_secs.to_string(),
        "--retries".to_string(),
        r.retries.to_string(),
        "--fragment-retries".to_string(),
        r.fragment_retries.to_string(),
        "--concurrent-fragments".to_string(),
        r.concurrent_fragments.to_string(),
    ]);
    push_all(
        args,
        [
            "--no-write-description",
            "--no-write-info-json",
            "--no-write-comments",
            "--no-write-subs",
            "--no-embed-subs",
        ],
    );
}

fn push_all<const N: usize>(args: &mut Vec<String>, items: [&str; N]) {
    args.extend(items.iter().map(|s| s.to_string()));
}

/// Primary command for a request.
pub fn build_command(request: &DownloadRequest) -> YtDlpCommand {
    CommandBuilder::primary(request).build()
}

/// Reduced-quality command for the same request.
pub fn build_fallback_command(request: &DownloadRequest) -> YtDlpCommand {
    CommandBuilder::fallback(request).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(url: &str, format: &str, audio_only: bool, remove_watermark: bool) -> DownloadRequest {
        DownloadRequest::new(
            url,
            DownloadOptions {
                format: format.to_string(),
                audio_only,
                remove_watermark,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_quality_parsing() {
        assert_eq!(QualityTarget::parse("mp4-1080p"), QualityTarget::MaxHeight(1080));
        assert_eq!(QualityTarget::parse("webm-480"), QualityTarget::MaxHeight(480));
        assert_eq!(QualityTarget::parse("mp4"), QualityTarget::MaxHeight(DEFAULT_HEIGHT));
        assert_eq!(QualityTarget::parse("mp4-hd"), QualityTarget::MaxHeight(DEFAULT_HEIGHT));
        assert_eq!(QualityTarget::parse("mp4-0p"), QualityTarget::MaxHeight(DEFAULT_HEIGHT));
        assert_eq!(QualityTarget::parse("best"), QualityTarget::Best);
        assert_eq!(QualityTarget::parse(""), QualityTarget::Best);
    }

    #[test]
    fn test_fallback_height_is_strictly_lower() {
        assert_eq!(QualityTarget::Best.fallback_height(), 480);
        assert_eq!(QualityTarget::MaxHeight(2160).fallback_height(), 480);
        assert_eq!(QualityTarget::MaxHeight(720).fallback_height(), 480);
        assert_eq!(QualityTarget::MaxHeight(480).fallback_height(), 360);
        assert_eq!(QualityTarget::MaxHeight(360).fallback_height(), 240);
        assert_eq!(QualityTarget::MaxHeight(500).fallback_height(), 480);
    }

    #[test]
    fn test_video_command_with_explicit_tier() {
        let cmd = build_command(&request("https://vimeo.com/123", "mp4-720p", false, false));
        assert_eq!(
            cmd.format_selector(),
            Some("best[height<=720][filesize<200M]/best[height<=720][filesize<100M]/best[height<=720]/best[filesize<100M]/worst")
        );
        assert_eq!(cmd.arg_value("--merge-output-format"), Some("mp4"));
        assert_eq!(cmd.arg_value("-o"), Some("%(title).50s.%(ext)s"));
        assert!(!cmd.has_arg("--extract-audio"));
    }

    #[test]
    fn test_video_command_best_chain() {
        let cmd = build_command(&request("https://vimeo.com/123", "best", false, false));
        assert_eq!(
            cmd.format_selector(),
            Some("best[height<=1080][filesize<200M]/best[height<=720][filesize<100M]/best[filesize<100M]/best[height<=720]/worst")
        );
    }

    #[test]
    fn test_audio_only_has_extraction_and_no_height_filter() {
        for url in [
            "https://www.youtube.com/watch?v=abc",
            "https://www.tiktok.com/@x/video/1",
            "https://vimeo.com/1",
        ] {
            for format in ["mp4-1080p", "best", ""] {
                let req = request(url, format, true, false);
                for cmd in [build_command(&req), build_fallback_command(&req)] {
                    assert!(cmd.has_arg("--extract-audio"));
                    assert_eq!(cmd.arg_value("--audio-format"), Some("mp3"));
                    assert!(!cmd.args().iter().any(|a| a.contains("height")));
                    assert!(!cmd.has_arg("--merge-output-format"));
                }
            }
        }
    }

    #[test]
    fn test_tiktok_watermark_and_no_size_filters() {
        let req = request("https://www.tiktok.com/@x/video/123", "mp4-720p", false, true);
        let cmd = build_command(&req);

        assert!(cmd.arg_values("--extractor-args").any(|v| v == "tiktok:watermark=false"));
        assert!(!cmd.args().iter().any(|a| a.contains("filesize")));
        assert_eq!(
            cmd.format_selector(),
            Some("best[height<=720]/best/worst")
        );

        let fallback = build_fallback_command(&req);
        assert!(!fallback.args().iter().any(|a| a.contains("filesize")));
        assert!(fallback.arg_values("--extractor-args").any(|v| v == "tiktok:watermark=false"));
    }

    #[test]
    fn test_tiktok_without_watermark_flag() {
        let cmd = build_command(&request("https://www.tiktok.com/@x/video/123", "best", false, false));
        assert!(!cmd.has_arg("--extractor-args"));
    }

    #[test]
    fn test_watermark_flag_ignored_for_other_platforms() {
        let cmd = build_command(&request("https://vimeo.com/1", "best", false, true));
        assert!(!cmd.args().iter().any(|a| a.contains("watermark")));
    }

    #[test]
    fn test_youtube_and_instagram_flags() {
        let yt = build_command(&request("https://youtu.be/abc", "best", false, false));
        assert!(yt.has_arg("--no-warnings"));
        assert!(yt.has_arg("--no-playlist"));
        assert!(yt.arg_values("--extractor-args").any(|v| v == "youtube:player_client=web"));

        let ig = build_command(&request("https://www.instagram.com/reel/abc/", "best", false, false));
        assert!(ig.has_arg("--no-warnings"));
        assert!(!ig.has_arg("--no-playlist"));
    }

    #[test]
    fn test_robustness_flags_always_present() {
        let req = request("https://www.dailymotion.com/video/x1", "mp4-360p", false, false);
        for cmd in [build_command(&req), build_fallback_command(&req)] {
            for flag in [
                "--no-check-certificate",
                "--prefer-ffmpeg",
                "--socket-timeout",
                "--retries",
                "--fragment-retries",
                "--concurrent-fragments",
                "--no-write-description",
                "--no-write-info-json",
                "--no-write-comments",
                "--no-embed-subs",
            ] {
                assert!(cmd.has_arg(flag), "missing {}", flag);
            }
        }
    }

    #[test]
    fn test_url_is_last_after_separator() {
        let cmd = build_command(&request("https://vimeo.com/42", "best", false, false));
        let n = cmd.args().len();
        assert_eq!(cmd.args()[n - 2], "--");
        assert_eq!(cmd.args()[n - 1], "https://vimeo.com/42");
    }

    #[test]
    fn test_fallback_targets_lower_quality() {
        let req = request("https://vimeo.com/1", "mp4-720p", false, false);
        let fallback = build_fallback_command(&req);
        assert_eq!(
            fallback.format_selector(),
            Some("worst[height<=480][filesize<50M]/worst[ext=mp4]/worst")
        );
        assert_eq!(fallback.arg_value("-o"), Some("%(title).30s.%(ext)s"));
        assert_eq!(fallback.arg_value("--socket-timeout"), Some("20"));
        assert_eq!(fallback.arg_value("--retries"), Some("1"));

        let audio = build_fallback_command(&request("https://vimeo.com/1", "", true, false));
        assert_eq!(audio.arg_value("--audio-quality"), Some("128K"));
    }

    #[test]
    fn test_invocation_binds_bin_and_cwd() {
        let cmd = build_command(&request("https://vimeo.com/1", "best", false, false));
        let inv = cmd.invocation("/usr/local/bin/yt-dlp", Path::new("/tmp/ws"));
        assert_eq!(inv.program, "/usr/local/bin/yt-dlp");
        assert_eq!(inv.cwd.as_deref(), Some(Path::new("/tmp/ws")));
        assert_eq!(inv.args, cmd.args());
    }
}
