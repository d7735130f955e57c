//! vidfetch - HTTP backend for analyzing and downloading online videos
//!
//! Wraps yt-dlp behind three endpoints (`/analyze`, `/download`, `/health`).
//! Every download runs in its own temporary workspace, falls back once to a
//! cheaper command on timeout or output overflow, and is returned to the
//! client as a single binary body.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, process execution, URL
//!   validation, workspaces and the HTTP server
//! - `download`: command building, fallback policy, output location,
//!   metadata analysis and the orchestrating `MediaService`
//! - `testing`: scripted process runner for tests
//! - `cli`: command line definitions

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod cli;
pub mod core;
pub mod download;
pub mod testing;

// Re-export commonly used types for convenience
pub use core::{config, AppConfig, AppError};
pub use download::{DownloadRequest, MediaService};
