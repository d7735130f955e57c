use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;

use vidfetch::cli::{Cli, Commands};
use vidfetch::core::validation::validate_media_url;
use vidfetch::core::web_server::start_web_server;
use vidfetch::core::error::{AppError, AppResult};
use vidfetch::core::{init_logger, AppConfig};
use vidfetch::download::{DownloadOptions, DownloadRequest, MediaService};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the chosen subcommand.
///
/// # Errors
/// Returns an error if configuration is invalid, the logger cannot be
/// initialized, or the chosen command fails.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    let mut config = AppConfig::from_env()?;
    init_logger(&config.log_level, config.log_file.as_deref())?;

    match cli.command {
        Some(Commands::Serve { host, port, temp_dir }) => {
            apply_overrides(&mut config, host, port, temp_dir);
            run_server(config).await
        }
        Some(Commands::Analyze { url, json }) => run_cli_analyze(config, url, json).await.map_err(log_failure),
        Some(Commands::Download {
            url,
            format,
            audio_only,
            remove_watermark,
            output,
        }) => {
            let options = DownloadOptions {
                format,
                audio_only,
                remove_watermark,
            };
            run_cli_download(config, url, options, output).await.map_err(log_failure)
        }
        Some(Commands::Check) => run_check(config).await.map_err(log_failure),
        None => {
            log::info!("No command specified, starting server");
            run_server(config).await
        }
    }
}

fn apply_overrides(config: &mut AppConfig, host: Option<std::net::IpAddr>, port: Option<u16>, temp_dir: Option<PathBuf>) {
    if let Some(host) = host {
        config.bind_addr = SocketAddr::new(host, config.bind_addr.port());
    }
    if let Some(port) = port {
        config.bind_addr.set_port(port);
    }
    if let Some(dir) = temp_dir {
        config.temp_root = dir;
    }
}

/// Logs a failed CLI command at a level matching who caused it.
fn log_failure(err: AppError) -> anyhow::Error {
    if err.is_client_error() {
        log::warn!("Rejected input: {}", err);
    } else {
        log::error!("Command failed: {}", err);
    }
    err.into()
}

async fn run_server(config: AppConfig) -> Result<()> {
    fs_err::tokio::create_dir_all(&config.temp_root).await?;
    log::info!("Workspaces under {}", config.temp_root.display());

    let service = MediaService::with_process_runner(config);
    match service.health().await {
        Ok(report) => log::info!(
            "yt-dlp {} (ffmpeg: {})",
            report.version,
            report.ffmpeg.as_deref().unwrap_or("not found")
        ),
        Err(e) => log::warn!("yt-dlp is not usable yet: {}", e),
    }

    start_web_server(service).await
}

async fn run_cli_analyze(config: AppConfig, url: String, json: bool) -> AppResult<()> {
    let media = validate_media_url(&url)?;
    let service = MediaService::with_process_runner(config);
    let summary = service.analyze(&media).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Title: {}", summary.title);
    println!("Uploader: {}", summary.uploader);
    println!("Platform: {}", summary.platform);
    println!("Duration: {}", summary.duration);
    println!("Views: {}", summary.view_count);
    if let Some(date) = &summary.upload_date {
        println!("Uploaded: {}", date);
    }
    println!("Formats:");
    for format in &summary.formats {
        println!("  {:<8} {:<5} {}", format.quality, format.format, format.size);
    }
    Ok(())
}

async fn run_cli_download(config: AppConfig, url: String, options: DownloadOptions, output: PathBuf) -> AppResult<()> {
    let request = DownloadRequest::new(&url, options)?;
    let service = MediaService::with_process_runner(config);

    println!("Downloading {} ({})", request.media.as_str(), request.platform());
    let outcome = service.download(&request).await?;

    fs_err::tokio::create_dir_all(&output).await?;
    let path = output.join(&outcome.payload.file_name);
    fs_err::tokio::write(&path, &outcome.payload.bytes).await?;

    println!(
        "Saved {} ({} bytes, {} attempt)",
        path.display(),
        outcome.payload.bytes.len(),
        outcome.attempt
    );
    Ok(())
}

async fn run_check(config: AppConfig) -> AppResult<()> {
    let service = MediaService::with_process_runner(config);
    let report = service.health().await?;
    println!("yt-dlp version: {}", report.version);
    match report.ffmpeg {
        Some(line) => println!("{}", line),
        None => println!("ffmpeg: not found"),
    }
    Ok(())
}
