//! Command lines for the retrieval and trim tools

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::model::*;
use crate::domain::rules::{EncodeRates, SectionWindow, TrimPlan};

/// Base name of the retrieved file inside the job's temp directory
pub const SOURCE_BASE_NAME: &str = "source";

/// Reliability flags passed to every retrieval invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalOptions {
    pub socket_timeout_secs: u32,
    pub retries: u32,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            socket_timeout_secs: 30,
            retries: 3,
        }
    }
}

/// Encoders used by frame-accurate trims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for EncoderOptions {
    #[cfg(target_os = "macos")]
    fn default() -> Self {
        Self {
            video_codec: "h264_videotoolbox".to_string(),
            audio_codec: "aac_at".to_string(),
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn default() -> Self {
        Self {
            video_codec: "h264_nvenc".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

/// Format selection expression for the retrieval tool
pub fn format_selector(quality: QualityTier, container: Container) -> String {
    if container.is_audio_only() {
        return "bestaudio[ext=m4a]/bestaudio/best".to_string();
    }
    let h = quality.max_height();
    format!(
        "bestvideo[height<={h}]+bestaudio/best[height<={h}]/best",
        h = h
    )
}

fn reliability_args(options: &RetrievalOptions) -> Vec<String> {
    vec![
        "--no-check-certificates".to_string(),
        "--socket-timeout".to_string(),
        options.socket_timeout_secs.to_string(),
        "--retries".to_string(),
        options.retries.to_string(),
    ]
}

/// Metadata dump without downloading anything
pub fn probe_args(url: &str, options: &RetrievalOptions) -> Vec<String> {
    let mut args = vec![
        "--dump-single-json".to_string(),
        "--skip-download".to_string(),
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
    ];
    args.extend(reliability_args(options));
    args.push("--".to_string());
    args.push(url.trim().to_string());
    args
}

/// Download invocation writing `<temp_dir>/source.<ext>`
pub fn retrieval_args(
    request: &ClipRequest,
    temp_dir: &Path,
    section: Option<&SectionWindow>,
    options: &RetrievalOptions,
) -> Vec<String> {
    let template = temp_dir.join(format!("{}.%(ext)s", SOURCE_BASE_NAME));
    let mut args = vec![
        "--no-playlist".to_string(),
        "--newline".to_string(),
        "--progress".to_string(),
        "-f".to_string(),
        format_selector(request.quality, request.container),
        "-o".to_string(),
        template.to_string_lossy().into_owned(),
    ];

    if request.container.is_audio_only() {
        args.extend([
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            request.container.extension().to_string(),
        ]);
    } else {
        args.extend([
            "--merge-output-format".to_string(),
            request.container.extension().to_string(),
        ]);
    }

    if let Some(section) = section {
        args.extend([
            "--download-sections".to_string(),
            format!("*{:.3}-{:.3}", section.from.seconds, section.to.seconds),
        ]);
    }

    args.extend(reliability_args(options));
    args.push("--".to_string());
    args.push(request.url.trim().to_string());
    args
}

/// Trim invocation; machine-readable progress goes to stdout
pub fn trim_args(
    input: &Path,
    output: &Path,
    plan: &TrimPlan,
    request: &ClipRequest,
    encoders: &EncoderOptions,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-loglevel".into(),
        "error".into(),
        "-ss".into(),
        plan.start.format_hms(),
        "-to".into(),
        plan.end.format_hms(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
    ];

    match request.accuracy {
        Accuracy::Fast => {
            args.extend(
                ["-c", "copy", "-avoid_negative_ts", "make_zero"]
                    .iter()
                    .map(|s| s.to_string()),
            );
        }
        Accuracy::FrameAccurate => {
            let rates = EncodeRates::for_request(request);
            if request.container.is_audio_only() {
                args.push("-vn".into());
            } else {
                args.extend([
                    "-c:v".into(),
                    encoders.video_codec.clone(),
                    "-b:v".into(),
                    format!("{}k", rates.video_kbps),
                    "-maxrate".into(),
                    format!("{}k", rates.max_kbps),
                    "-bufsize".into(),
                    format!("{}k", rates.buffer_kbps),
                ]);
            }
            args.extend([
                "-c:a".into(),
                encoders.audio_codec.clone(),
                "-b:a".into(),
                format!("{}k", rates.audio_kbps),
            ]);
        }
    }

    if request.container.supports_faststart() {
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }

    args.extend([
        "-progress".into(),
        "pipe:1".into(),
        "-nostats".into(),
        "-n".into(),
        output.to_string_lossy().into_owned(),
    ]);
    args
}
