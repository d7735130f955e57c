//! Logging initialization
//!
//! Console output always; a log file as well when `LOG_FILE_PATH` is set.

use anyhow::Result;
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

/// Initialize logger for console and optional file output
///
/// # Arguments
/// * `level` - Level filter name (`error`, `warn`, `info`, `debug`, `trace`); unknown names mean `info`
/// * `log_file_path` - Optional path to a log file, truncated on start
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the log file or a logger was already set
pub fn init_logger(level: &str, log_file_path: Option<&Path>) -> Result<()> {
    let level = parse_level(level);

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file_path {
        let log_file = File::create(path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
        loggers.push(WriteLogger::new(level, Config::default(), log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::Info)
}
