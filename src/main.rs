//! ClipFetch
//!
//! Clips a time range out of an online video: the retrieval tool (yt-dlp)
//! downloads the source into a per-job temporary directory, then the trim
//! tool (ffmpeg) cuts the requested range into the output folder.
//!
//! # Usage
//!
//! ```bash
//! clipfetch clip --url "https://example.com/watch?v=abc" --start 1:10 --end 1:40
//! clipfetch clip -u "https://example.com/watch?v=abc" -s 10 -e 70 --accuracy frame-accurate --json
//! clipfetch tools
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use clipfetch::adapters::tracing_log::init_tracing;
use clipfetch::adapters::AppConfig;
use clipfetch::cli::{commands, Cli, Commands};

/// Main entry point for the ClipFetch CLI application
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    info!("Starting ClipFetch");
    let config = AppConfig::load(cli.config.as_deref())?;

    let code = match cli.command {
        Commands::Clip(args) => {
            info!("Executing clip command");
            let outcome = commands::clip(args, config).await?;
            commands::exit_code(outcome.stage())
        }
        Commands::Tools(args) => {
            info!("Executing tools command");
            if commands::tools(args, &config)? {
                0
            } else {
                1
            }
        }
    };

    Ok(ExitCode::from(code))
}
