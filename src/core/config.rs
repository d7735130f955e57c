//! Runtime configuration.
//!
//! Everything is read once from the environment (optionally seeded by a
//! `.env` file) into an [`AppConfig`] that is handed to the components that
//! need it. Nothing here is global.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable present but not parseable
    #[error("{name}={value:?} is not a valid value")]
    InvalidValue { name: String, value: String },

    /// Limits that break the fallback invariant
    #[error("fallback {what} ({fallback}) must be smaller than the primary {what} ({primary})")]
    FallbackNotSmaller {
        what: &'static str,
        primary: String,
        fallback: String,
    },
}

/// Defaults
pub mod defaults {
    /// Port the standalone backend listens on
    pub const PORT: u16 = 3001;

    /// Primary download attempt (3 minutes, 500 MB of captured output)
    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 180;
    pub const DOWNLOAD_MAX_OUTPUT_MB: usize = 500;

    /// Reduced-quality retry (2 minutes, 100 MB)
    pub const FALLBACK_TIMEOUT_SECS: u64 = 120;
    pub const FALLBACK_MAX_OUTPUT_MB: usize = 100;

    /// Metadata dump (30 seconds, 10 MB)
    pub const ANALYZE_TIMEOUT_SECS: u64 = 30;
    pub const ANALYZE_MAX_OUTPUT_MB: usize = 10;

    /// `--version` probes for /health
    pub const HEALTH_TIMEOUT_SECS: u64 = 10;
}

/// Bounds applied to one external tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecLimits {
    /// Wall-clock deadline for the whole process
    pub timeout: Duration,
    /// Per-stream ceiling for captured stdout/stderr, in bytes
    pub max_output_bytes: usize,
}

impl ExecLimits {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            timeout,
            max_output_bytes,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// yt-dlp binary path
    pub ytdlp_bin: String,
    /// ffmpeg binary path (only probed by /health)
    pub ffmpeg_bin: String,
    /// Root under which per-request workspaces are created
    pub temp_root: PathBuf,
    /// Primary download attempt
    pub download: ExecLimits,
    /// Reduced-quality retry
    pub fallback: ExecLimits,
    /// Metadata dump
    pub analyze: ExecLimits,
    /// Version probes
    pub health_timeout: Duration,
    /// Optional log file in addition to the terminal
    pub log_file: Option<PathBuf>,
    /// Log level filter (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), defaults::PORT),
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            temp_root: env::temp_dir().join("vidfetch"),
            download: ExecLimits::new(
                Duration::from_secs(defaults::DOWNLOAD_TIMEOUT_SECS),
                defaults::DOWNLOAD_MAX_OUTPUT_MB * 1024 * 1024,
            ),
            fallback: ExecLimits::new(
                Duration::from_secs(defaults::FALLBACK_TIMEOUT_SECS),
                defaults::FALLBACK_MAX_OUTPUT_MB * 1024 * 1024,
            ),
            analyze: ExecLimits::new(
                Duration::from_secs(defaults::ANALYZE_TIMEOUT_SECS),
                defaults::ANALYZE_MAX_OUTPUT_MB * 1024 * 1024,
            ),
            health_timeout: Duration::from_secs(defaults::HEALTH_TIMEOUT_SECS),
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// Unset variables fall back to [`AppConfig::default`]. Call
    /// `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();

        let host: IpAddr = parse_or(&lookup, "BIND_ADDR", base.bind_addr.ip())?;
        let port: u16 = parse_or(&lookup, "PORT", base.bind_addr.port())?;

        let config = Self {
            bind_addr: SocketAddr::new(host, port),
            ytdlp_bin: lookup("YTDL_BIN").unwrap_or(base.ytdlp_bin),
            ffmpeg_bin: lookup("FFMPEG_BIN").unwrap_or(base.ffmpeg_bin),
            temp_root: lookup("TEMP_FILES_DIR").map(PathBuf::from).unwrap_or(base.temp_root),
            download: ExecLimits::new(
                Duration::from_secs(parse_or(&lookup, "DOWNLOAD_TIMEOUT_SECS", defaults::DOWNLOAD_TIMEOUT_SECS)?),
                megabytes(&lookup, "DOWNLOAD_MAX_OUTPUT_MB", defaults::DOWNLOAD_MAX_OUTPUT_MB)?,
            ),
            fallback: ExecLimits::new(
                Duration::from_secs(parse_or(&lookup, "FALLBACK_TIMEOUT_SECS", defaults::FALLBACK_TIMEOUT_SECS)?),
                megabytes(&lookup, "FALLBACK_MAX_OUTPUT_MB", defaults::FALLBACK_MAX_OUTPUT_MB)?,
            ),
            analyze: ExecLimits::new(
                Duration::from_secs(parse_or(&lookup, "ANALYZE_TIMEOUT_SECS", defaults::ANALYZE_TIMEOUT_SECS)?),
                megabytes(&lookup, "ANALYZE_MAX_OUTPUT_MB", defaults::ANALYZE_MAX_OUTPUT_MB)?,
            ),
            health_timeout: Duration::from_secs(parse_or(&lookup, "HEALTH_TIMEOUT_SECS", defaults::HEALTH_TIMEOUT_SECS)?),
            log_file: lookup("LOG_FILE_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            log_level: lookup("LOG_LEVEL").unwrap_or(base.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// The fallback attempt must be strictly cheaper than the primary one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback.timeout >= self.download.timeout {
            return Err(ConfigError::FallbackNotSmaller {
                what: "timeout",
                primary: format!("{}s", self.download.timeout.as_secs()),
                fallback: format!("{}s", self.fallback.timeout.as_secs()),
            });
        }
        if self.fallback.max_output_bytes >= self.download.max_output_bytes {
            return Err(ConfigError::FallbackNotSmaller {
                what: "output ceiling",
                primary: format!("{} bytes", self.download.max_output_bytes),
                fallback: format!("{} bytes", self.fallback.max_output_bytes),
            });
        }
        Ok(())
    }
}

/// A size in MB, returned in bytes. Values whose byte count overflows are invalid.
fn megabytes<F>(lookup: &F, name: &str, default_mb: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mb: usize = parse_or(lookup, name, default_mb)?;
    mb.checked_mul(1024 * 1024).ok_or_else(|| ConfigError::InvalidValue {
        name: name.to_string(),
        value: mb.to_string(),
    })
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
        _ => Ok(default),
    }
}
