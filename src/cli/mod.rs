//! CLI module for ClipFetch
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;
pub mod report;

/// ClipFetch
///
/// Fetches a video from a URL with yt-dlp and cuts the requested time range
/// out of it with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "clipfetch")]
#[command(about = "ClipFetch - Clip a time range out of an online video")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Emit diagnostic logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (defaults to the platform config dir)
    #[arg(long, env = "CLIPFETCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a video and cut a segment out of it
    Clip(args::ClipArgs),
    /// Check that the retrieval and trim tools are usable
    Tools(args::ToolsArgs),
}
