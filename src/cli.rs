use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidfetch")]
#[command(author, version, about = "HTTP backend for analyzing and downloading online videos with yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind to (overrides BIND_ADDR)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Root directory for per-request workspaces (overrides TEMP_FILES_DIR)
        #[arg(long)]
        temp_dir: Option<PathBuf>,
    },

    /// Print a metadata summary for a URL
    Analyze {
        /// Video URL
        url: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a URL into a local directory
    Download {
        /// Video URL
        url: String,

        /// Format identifier, e.g. mp4-720p or best
        #[arg(short, long, default_value = "best")]
        format: String,

        /// Extract audio as mp3
        #[arg(long)]
        audio_only: bool,

        /// Ask TikTok for the watermark-free variant
        #[arg(long)]
        remove_watermark: bool,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Check that yt-dlp and ffmpeg are available
    Check,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
