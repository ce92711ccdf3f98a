// Domain rules - Business logic and policies

use std::path::{Path, PathBuf};

use crate::domain::errors::DomainError;
use crate::domain::model::*;


/// Share of overall progress owned by the retrieval stage
pub const RETRIEVAL_WEIGHT: f64 = 0.6;
/// Share of overall progress owned by the trim stage
pub const TRIM_WEIGHT: f64 = 0.4;

const MAX_VIDEO_MBPS: f64 = 200.0;
const AUDIO_KBPS_RANGE: std::ops::RangeInclusive<u32> = 32..=512;
const DEFAULT_AUDIO_KBPS: u32 = 192;

/// Check a request before any subprocess is launched
pub fn validate_request(request: &ClipRequest) -> Result<ClipWindow, DomainError> {
    validate_url(&request.url)?;

    let start = TimeSpec::parse(&request.start)?;
    let end = TimeSpec::parse(&request.end)?;
    if end.seconds <= start.seconds {
        return Err(DomainError::ValidationFailed(format!(
            "End time ({}) must be after start time ({})",
            end, start
        )));
    }

    if let Some(mbps) = request.video_mbps {
        if !(mbps > 0.0 && mbps <= MAX_VIDEO_MBPS) {
            return Err(DomainError::ValidationFailed(format!(
                "Video bitrate must be in (0, {}] Mbps, got {}",
                MAX_VIDEO_MBPS, mbps
            )));
        }
    }
    if let Some(kbps) = request.audio_kbps {
        if !AUDIO_KBPS_RANGE.contains(&kbps) {
            return Err(DomainError::ValidationFailed(format!(
                "Audio bitrate must be in [{}, {}] kbps, got {}",
                AUDIO_KBPS_RANGE.start(),
                AUDIO_KBPS_RANGE.end(),
                kbps
            )));
        }
    }

    if !request.output_folder.is_dir() {
        return Err(DomainError::ValidationFailed(format!(
            "Output folder does not exist: {}",
            request.output_folder.display()
        )));
    }
    if request.filename_template.trim().is_empty() {
        return Err(DomainError::ValidationFailed(
            "Filename template cannot be empty".to_string(),
        ));
    }

    Ok(ClipWindow { start, end })
}

fn validate_url(raw: &str) -> Result<(), DomainError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| DomainError::ValidationFailed(format!("Invalid URL '{}': {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DomainError::ValidationFailed(format!(
            "Unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(DomainError::ValidationFailed(format!(
            "URL has no host: {}",
            raw
        )));
    }
    Ok(())
}

/// Blend a stage-local fraction into whole-job progress
pub fn overall_progress(stage: JobStage, stage_progress: f64) -> f64 {
    let p = stage_progress.clamp(0.0, 1.0);
    match stage {
        JobStage::Retrieving => p * RETRIEVAL_WEIGHT,
        JobStage::Trimming => RETRIEVAL_WEIGHT + p * TRIM_WEIGHT,
        JobStage::Finished => 1.0,
        JobStage::Idle | JobStage::Failed | JobStage::Canceled => 0.0,
    }
}

/// Keeps a stage's progress monotonic non-decreasing within [0, 1]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressGate {
    current: f64,
}

impl ProgressGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw sample; returns the new value only when it moved forward
    pub fn advance(&mut self, sample: f64) -> Option<f64> {
        if sample.is_nan() {
            return None;
        }
        let clamped = sample.clamp(0.0, 1.0);
        if clamped > self.current {
            self.current = clamped;
            Some(clamped)
        } else {
            None
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }
}

/// Find a path that does not exist yet, appending " (n)" before the extension.
///
/// `path` itself is tried first, then " (1)" through " (limit)". Returns `None`
/// when every candidate is taken.
pub fn resolve_conflict(
    path: &Path,
    limit: usize,
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    if !exists(path) {
        return Some(path.to_path_buf());
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..=limit)
        .map(|n| parent.join(format!("{} ({}){}", stem, n, extension)))
        .find(|candidate| !exists(candidate))
}

/// Video/audio rate settings for frame-accurate re-encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeRates {
    pub video_kbps: u64,
    pub max_kbps: u64,
    pub buffer_kbps: u64,
    pub audio_kbps: u32,
}

impl EncodeRates {
    /// Peak rate is 1.5x the target, buffer holds two seconds at target
    pub fn derive(video_mbps: f64, audio_kbps: u32) -> Self {
        let video_kbps = (video_mbps * 1000.0).round() as u64;
        Self {
            video_kbps,
            max_kbps: (video_kbps as f64 * 1.5).round() as u64,
            buffer_kbps: video_kbps * 2,
            audio_kbps,
        }
    }

    pub fn for_request(request: &ClipRequest) -> Self {
        Self::derive(
            request
                .video_mbps
                .unwrap_or_else(|| request.quality.default_video_mbps()),
            request.audio_kbps.unwrap_or(DEFAULT_AUDIO_KBPS),
        )
    }
}

/// Portion of the source handed to the retrieval tool's section flag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionWindow {
    pub from: TimeSpec,
    pub to: TimeSpec,
}

impl SectionWindow {
    /// Pad the clip on both sides so the trim can still cut precisely
    pub fn around(window: &ClipWindow, padding_secs: f64) -> Self {
        let padding = padding_secs.max(0.0);
        Self {
            from: TimeSpec::from_seconds((window.start.seconds - padding).max(0.0)),
            to: TimeSpec::from_seconds(window.end.seconds + padding),
        }
    }
}

/// Where the trim tool should cut, on the timeline of the retrieved file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimPlan {
    pub start: TimeSpec,
    pub end: TimeSpec,
}

impl TrimPlan {
    pub fn new(window: &ClipWindow, section: Option<&SectionWindow>) -> Self {
        let offset = section.map_or(0.0, |s| s.from.seconds);
        Self {
            start: TimeSpec::from_seconds(window.start.seconds - offset),
            end: TimeSpec::from_seconds(window.end.seconds - offset),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end.seconds - self.start.seconds
    }
}
