//! URL validation utilities
//!
//! Every inbound URL goes through [`validate_media_url`] before any process is
//! spawned. Uses a whitelist approach:
//! - Only HTTP/HTTPS schemes allowed
//! - Host must be one of the supported platform domains (or a subdomain)

use std::fmt;
use thiserror::Error;
use url::Url;

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// No URL in the request body
    #[error("URL is required")]
    MissingUrl,

    /// Not parseable, bad scheme, or host outside the allow-list
    #[error("Invalid or unsupported URL: {0}")]
    UnsupportedUrl(String),
}

/// Platforms we accept URLs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    TikTok,
    YouTube,
    Facebook,
    Instagram,
    Twitter,
    Vimeo,
    Dailymotion,
    Twitch,
    Reddit,
    Streamable,
}

/// Allow-listed domains and the platform each one belongs to.
const SUPPORTED_DOMAINS: &[(&str, Platform)] = &[
    ("tiktok.com", Platform::TikTok),
    ("youtube.com", Platform::YouTube),
    ("youtu.be", Platform::YouTube),
    ("facebook.com", Platform::Facebook),
    ("fb.watch", Platform::Facebook),
    ("instagram.com", Platform::Instagram),
    ("twitter.com", Platform::Twitter),
    ("x.com", Platform::Twitter),
    ("vimeo.com", Platform::Vimeo),
    ("dailymotion.com", Platform::Dailymotion),
    ("twitch.tv", Platform::Twitch),
    ("reddit.com", Platform::Reddit),
    ("streamable.com", Platform::Streamable),
];

impl Platform {
    /// Detect the platform from a URL's host. `None` for hosts outside the allow-list.
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_lowercase();
        SUPPORTED_DOMAINS
            .iter()
            .find(|(domain, _)| host == *domain || host.ends_with(&format!(".{}", domain)))
            .map(|(_, platform)| *platform)
    }

    /// Tag reported to clients in the analysis result.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Vimeo => "vimeo",
            Platform::Dailymotion => "dailymotion",
            Platform::Twitch => "twitch",
            Platform::Reddit => "reddit",
            Platform::Streamable => "streamable",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL that passed validation, together with its detected platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUrl {
    pub url: Url,
    pub platform: Platform,
}

impl MediaUrl {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Validates that a URL points at a supported platform.
///
/// # Examples
/// ```
/// use vidfetch::core::validation::{validate_media_url, Platform};
///
/// let media = validate_media_url("https://www.tiktok.com/@x/video/123").unwrap();
/// assert_eq!(media.platform, Platform::TikTok);
///
/// assert!(validate_media_url("https://evil.com/watch?v=1").is_err());
/// assert!(validate_media_url("ftp://youtube.com/video").is_err());
/// assert!(validate_media_url("not a url").is_err());
/// ```
pub fn validate_media_url(raw: &str) -> Result<MediaUrl, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::MissingUrl);
    }

    let url = Url::parse(raw).map_err(|_| ValidationError::UnsupportedUrl(raw.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ValidationError::UnsupportedUrl(format!(
            "{} (invalid scheme: {})",
            raw,
            url.scheme()
        )));
    }

    let platform = Platform::from_url(&url).ok_or_else(|| {
        ValidationError::UnsupportedUrl(format!(
            "{} (unsupported host: {})",
            raw,
            url.host_str().unwrap_or("none")
        ))
    })?;

    Ok(MediaUrl { url, platform })
}
