// Domain models - Core types and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::errors::DomainError;


/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Parse time string in various formats
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();
        let invalid = |what: &str| DomainError::ValidationFailed(format!("{} in '{}'", what, trimmed));

        if trimmed.is_empty() {
            return Err(DomainError::ValidationFailed("Time cannot be empty".to_string()));
        }

        // Plain seconds
        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid("Time must be a non-negative number"));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => (0, *m, *s),
            [h, m, s] => (
                h.parse::<u32>().map_err(|_| invalid("Invalid hours"))?,
                *m,
                *s,
            ),
            _ => {
                return Err(invalid(
                    "Unsupported time format (use seconds, MM:SS.ms or HH:MM:SS.ms)",
                ))
            }
        };

        let minutes = minutes
            .parse::<u32>()
            .map_err(|_| invalid("Invalid minutes"))?;
        let seconds_part = seconds_part
            .parse::<f64>()
            .map_err(|_| invalid("Invalid seconds"))?;

        if parts.len() == 3 && minutes >= 60 {
            return Err(invalid("Minutes must be less than 60"));
        }
        if !(0.0..60.0).contains(&seconds_part) {
            return Err(invalid("Seconds must be less than 60"));
        }

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds_part,
        ))
    }

    /// Format as HH:MM:SS.mmm, the form both external tools accept
    pub fn format_hms(&self) -> String {
        let total_ms = (self.seconds * 1000.0).round() as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let millis = total_ms % 1000;
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }

    /// Compact form for file names (1m30s, 1h02m03s, 45s)
    pub fn format_compact(&self) -> String {
        let total = self.seconds.floor() as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let secs = total % 60;

        if hours > 0 {
            format!("{}h{:02}m{:02}s", hours, minutes, secs)
        } else if minutes > 0 {
            format!("{}m{:02}s", minutes, secs)
        } else {
            format!("{}s", secs)
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Validated start/end pair of a clip, in source timeline seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipWindow {
    pub start: TimeSpec,
    pub end: TimeSpec,
}

impl ClipWindow {
    /// Length of the clip in seconds
    pub fn duration(&self) -> f64 {
        self.end.seconds - self.start.seconds
    }
}

/// Quality tier, expressed to the retrieval tool as a height ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Up to 2160p
    Best,
    /// Up to 1080p
    #[default]
    High,
    /// Up to 720p
    Medium,
    /// Up to 480p
    Low,
}

impl QualityTier {
    /// Parse quality tier from string
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.to_lowercase().as_str() {
            "best" | "2160" | "2160p" | "4k" => Ok(QualityTier::Best),
            "high" | "1080" | "1080p" => Ok(QualityTier::High),
            "medium" | "720" | "720p" => Ok(QualityTier::Medium),
            "low" | "480" | "480p" => Ok(QualityTier::Low),
            _ => Err(DomainError::ValidationFailed(format!(
                "Invalid quality: {}. Valid tiers: best, high, medium, low",
                value
            ))),
        }
    }

    /// Maximum video height for this tier
    pub fn max_height(&self) -> u32 {
        match self {
            QualityTier::Best => 2160,
            QualityTier::High => 1080,
            QualityTier::Medium => 720,
            QualityTier::Low => 480,
        }
    }

    /// Re-encode bitrate used when the request carries no override
    pub fn default_video_mbps(&self) -> f64 {
        match self {
            QualityTier::Best => 35.0,
            QualityTier::High => 8.0,
            QualityTier::Medium => 5.0,
            QualityTier::Low => 2.5,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.max_height())
    }
}

impl FromStr for QualityTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Mkv,
    Mov,
    /// Audio only
    M4a,
}

impl Container {
    /// Parse container from string
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim_start_matches('.').to_lowercase().as_str() {
            "mp4" => Ok(Container::Mp4),
            "mkv" => Ok(Container::Mkv),
            "mov" => Ok(Container::Mov),
            "m4a" => Ok(Container::M4a),
            _ => Err(DomainError::ValidationFailed(format!(
                "Invalid container: {}. Valid containers: mp4, mkv, mov, m4a",
                value
            ))),
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "mkv",
            Container::Mov => "mov",
            Container::M4a => "m4a",
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, Container::M4a)
    }

    /// ISO-BMFF family containers take the fast-start flag
    pub fn supports_faststart(&self) -> bool {
        matches!(self, Container::Mp4 | Container::Mov | Container::M4a)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Trim accuracy mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Accuracy {
    /// Lossless stream copy, cuts land on keyframes
    #[default]
    Fast,
    /// Re-encode for frame-exact boundaries
    FrameAccurate,
}

impl Accuracy {
    /// Parse accuracy mode from string
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.to_lowercase().as_str() {
            "fast" | "copy" | "approximate" => Ok(Accuracy::Fast),
            "frame-accurate" | "accurate" | "precise" | "reencode" => Ok(Accuracy::FrameAccurate),
            _ => Err(DomainError::ValidationFailed(format!(
                "Invalid accuracy: {}. Valid modes: fast, frame-accurate",
                value
            ))),
        }
    }
}

impl FromStr for Accuracy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Everything a caller supplies for one clip job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipRequest {
    pub url: String,
    pub start: String,
    pub end: String,
    pub quality: QualityTier,
    pub container: Container,
    pub accuracy: Accuracy,
    /// Video bitrate override for frame-accurate mode
    pub video_mbps: Option<f64>,
    /// Audio bitrate override for frame-accurate mode
    pub audio_kbps: Option<u32>,
    pub output_folder: PathBuf,
    pub filename_template: String,
    /// Fetch only the requested section instead of the whole video
    #[serde(default)]
    pub download_sections: bool,
}

/// Which external tool an invocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Retrieval,
    Trim,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Retrieval => f.write_str("retrieval tool"),
            ToolKind::Trim => f.write_str("trim tool"),
        }
    }
}

/// Lifecycle stage of the current job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    #[default]
    Idle,
    Retrieving,
    Trimming,
    Finished,
    Failed,
    Canceled,
}

impl JobStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Finished | JobStage::Failed | JobStage::Canceled)
    }

    /// A subprocess may be in flight
    pub fn is_running(&self) -> bool {
        matches!(self, JobStage::Retrieving | JobStage::Trimming)
    }

    /// A new job may start from here
    pub fn can_start(&self) -> bool {
        *self == JobStage::Idle || self.is_terminal()
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JobStage::Idle => "idle",
            JobStage::Retrieving => "retrieving",
            JobStage::Trimming => "trimming",
            JobStage::Finished => "finished",
            JobStage::Failed => "failed",
            JobStage::Canceled => "canceled",
        };
        f.write_str(text)
    }
}

/// Severity of a job log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: LogSeverity,
    pub message: String,
}

/// Append-only log that drops its oldest entries beyond a fixed capacity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogBook {
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl LogBook {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, severity: LogSeverity, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LogBook {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Metadata reported by the retrieval tool's probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    /// Duration of the source in seconds
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Final progress of each stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageProgress {
    pub retrieval: f64,
    pub trim: f64,
}

/// Published once a job finishes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub output_path: PathBuf,
    pub size_bytes: u64,
    pub progress: StageProgress,
    pub retrieval_secs: f64,
    pub trim_secs: f64,
    pub metadata: Option<VideoMetadata>,
}

/// Observable state of the current job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub job_id: Option<Uuid>,
    pub stage: JobStage,
    /// Every stage entered by the current job, in order
    pub trail: Vec<JobStage>,
    pub stage_progress: f64,
    pub overall_progress: f64,
    pub log: LogBook,
    pub result: Option<JobResult>,
    pub error: Option<DomainError>,
}

impl JobSnapshot {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            job_id: None,
            stage: JobStage::Idle,
            trail: vec![JobStage::Idle],
            stage_progress: 0.0,
            overall_progress: 0.0,
            log: LogBook::new(log_capacity),
            result: None,
            error: None,
        }
    }
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self::new(LogBook::DEFAULT_CAPACITY)
    }
}
