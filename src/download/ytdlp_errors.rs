//! yt-dlp failure classification
//!
//! Maps failures onto a fixed set of user-facing categories. Typed failures
//! (timeouts, missing output) map structurally; yt-dlp's stderr is matched by
//! substring.
//!
//! The substring rules are a known misclassification risk: yt-dlp's error
//! wording is not a stable contract, and rules are checked in order, so a
//! message mentioning both "unavailable" and "country" lands on
//! `Unavailable`. Anything unmatched becomes `Generic`.

use crate::core::process::ExecError;
use crate::download::error::DownloadError;

/// User-facing failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Timeout,
    Unavailable,
    GeoRestricted,
    Copyright,
    AgeRestricted,
    LiveStream,
    PremiumRequired,
    NoSuitableFormat,
    Forbidden,
    NotFound,
    Generic,
}

/// Which endpoint the message is for; /analyze has a coarser vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Analyze,
    Download,
}

/// Classify any pipeline failure.
pub fn classify_failure(err: &DownloadError) -> ErrorCategory {
    match err {
        DownloadError::Exec(ExecError::Timeout(_)) => ErrorCategory::Timeout,
        DownloadError::NoOutput | DownloadError::EmptyOutput(_) => ErrorCategory::Generic,
        other => classify_text(&other.diagnostic_text()),
    }
}

/// Classify raw yt-dlp output by substring. Order matters.
pub fn classify_text(text: &str) -> ErrorCategory {
    let lower = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["timeout", "timed out"]) {
        return ErrorCategory::Timeout;
    }
    if has(&["private", "unavailable"]) {
        return ErrorCategory::Unavailable;
    }
    if has(&["geo restrict", "geo-restrict", "geoblock", "in your country"]) {
        return ErrorCategory::GeoRestricted;
    }
    if has(&["copyright"]) {
        return ErrorCategory::Copyright;
    }
    if has(&[
        "age-restricted",
        "age restricted",
        "confirm your age",
        "age verification",
        "inappropriate for some users",
    ]) {
        return ErrorCategory::AgeRestricted;
    }
    if has(&["live event", "live stream", "livestream", "is live", "is_live"]) {
        return ErrorCategory::LiveStream;
    }
    if has(&["premium", "members-only", "join this channel"]) {
        return ErrorCategory::PremiumRequired;
    }
    if has(&["requested format", "no video formats", "format is not available"]) {
        return ErrorCategory::NoSuitableFormat;
    }
    if has(&["http error 403", "forbidden"]) {
        return ErrorCategory::Forbidden;
    }
    if has(&["http error 404"]) {
        return ErrorCategory::NotFound;
    }
    ErrorCategory::Generic
}

impl ErrorCategory {
    /// Short machine-readable tag, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Unavailable => "unavailable",
            ErrorCategory::GeoRestricted => "geo_restricted",
            ErrorCategory::Copyright => "copyright",
            ErrorCategory::AgeRestricted => "age_restricted",
            ErrorCategory::LiveStream => "live_stream",
            ErrorCategory::PremiumRequired => "premium_required",
            ErrorCategory::NoSuitableFormat => "no_suitable_format",
            ErrorCategory::Forbidden => "forbidden",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Generic => "generic",
        }
    }

    /// Message returned to the client in `{error}`.
    pub fn user_message(&self, op: Operation) -> &'static str {
        match op {
            Operation::Analyze => match self {
                ErrorCategory::Timeout => "Analysis timeout - please try again",
                ErrorCategory::Unavailable => "Video is private or unavailable",
                ErrorCategory::GeoRestricted => "Video is not available in your region",
                ErrorCategory::AgeRestricted => "Age-restricted content cannot be analyzed",
                _ => "Failed to analyze video - please check the URL",
            },
            Operation::Download => match self {
                ErrorCategory::Timeout => {
                    "Download timeout - the video may be too large or the server is busy. Try a lower quality format."
                }
                ErrorCategory::Unavailable => "Video is private or unavailable",
                ErrorCategory::GeoRestricted => "Video is not available in your region",
                ErrorCategory::Copyright => "Video is protected by copyright",
                ErrorCategory::AgeRestricted => "Age-restricted content cannot be downloaded",
                ErrorCategory::LiveStream => "Live streams cannot be downloaded",
                ErrorCategory::PremiumRequired => "This video requires a premium subscription",
                ErrorCategory::NoSuitableFormat => {
                    "No suitable video format found. The video may be unavailable or region-locked."
                }
                ErrorCategory::Forbidden => {
                    "Access forbidden - the video may be region-locked or require authentication"
                }
                ErrorCategory::NotFound => {
                    "Video not found - the URL may be incorrect or the video may have been deleted"
                }
                ErrorCategory::Generic => {
                    "Download failed - please check the URL and try again. If the issue persists, the video may not be publicly accessible."
                }
            },
        }
    }
}
