//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

use crate::adapters::AppConfig;
use crate::domain::model::{Accuracy, ClipRequest, Container, QualityTier};

fn parse_audio_kbps(s: &str) -> Result<u32, String> {
    number_range(s, 32, 512)
}

fn parse_grace_period_ms(s: &str) -> Result<u64, String> {
    number_range(s, 1, 60_000)
}

fn parse_video_mbps(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if value > 0.0 && value <= 200.0 {
        Ok(value)
    } else {
        Err("must be greater than 0 and at most 200".to_string())
    }
}

/// Arguments for the clip command
#[derive(Args, Debug)]
pub struct ClipArgs {
    /// Video page URL
    #[arg(short, long)]
    pub url: String,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub start: String,

    /// End time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub end: String,

    /// Quality tier (best, high, medium, low)
    #[arg(short, long, default_value = "high", value_parser = QualityTier::parse)]
    pub quality: QualityTier,

    /// Output container (mp4, mkv, mov, m4a)
    #[arg(long, default_value = "mp4", value_parser = Container::parse)]
    pub container: Container,

    /// Trim accuracy (fast, frame-accurate)
    #[arg(long, default_value = "fast", value_parser = Accuracy::parse)]
    pub accuracy: Accuracy,

    /// Video bitrate in Mbps for frame-accurate trims
    #[arg(long, value_parser = parse_video_mbps)]
    pub video_mbps: Option<f64>,

    /// Audio bitrate in kbps for frame-accurate trims (32-512)
    #[arg(long, value_parser = parse_audio_kbps)]
    pub audio_kbps: Option<u32>,

    /// Output folder (default from config)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Filename template, e.g. "{title} [{start}-{end}]"
    #[arg(short, long)]
    pub template: Option<String>,

    /// Download only the requested section instead of the whole video
    #[arg(long)]
    pub sections: bool,

    /// Print progress as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Show informational job log entries
    #[arg(short, long)]
    pub verbose: bool,

    /// Retrieval tool path or name
    #[arg(long, env = "CLIPFETCH_RETRIEVER")]
    pub retriever: Option<PathBuf>,

    /// Trim tool path or name
    #[arg(long, env = "CLIPFETCH_TRIMMER")]
    pub trimmer: Option<PathBuf>,

    /// Milliseconds to wait after a termination signal before killing a tool
    #[arg(long, value_parser = parse_grace_period_ms)]
    pub grace_period_ms: Option<u64>,
}

impl ClipArgs {
    /// Layer CLI flags over the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(retriever) = &self.retriever {
            config.tools.retriever = retriever.clone();
        }
        if let Some(trimmer) = &self.trimmer {
            config.tools.trimmer = trimmer.clone();
        }
        if let Some(grace) = self.grace_period_ms {
            config.supervisor.grace_period_ms = grace;
        }
        if let Some(folder) = &self.out_dir {
            config.output.folder = folder.clone();
        }
        if let Some(template) = &self.template {
            config.output.template = template.clone();
        }
    }

    pub fn to_request(&self, config: &AppConfig) -> ClipRequest {
        ClipRequest {
            url: self.url.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            quality: self.quality,
            container: self.container,
            accuracy: self.accuracy,
            video_mbps: self.video_mbps,
            audio_kbps: self.audio_kbps,
            output_folder: config.output.folder.clone(),
            filename_template: config.output.template.clone(),
            download_sections: self.sections,
        }
    }
}

/// Arguments for the tools command
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
