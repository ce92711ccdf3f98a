//! Progress extraction from external tool output
//!
//! Both parsers are total: any line they do not recognise yields an empty
//! `ParsedLine`, never an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::model::TimeSpec;

static DOWNLOAD_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("valid download percent regex")
});

static DOWNLOAD_DESTINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[download\]\s+Destination:\s+(.+?)\s*$").expect("valid destination regex")
});

static MERGED_INTO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\[Merger\]\s+Merging formats into\s+"(.+)"\s*$"#).expect("valid merger regex")
});

/// Non-progress information recognised in a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFragment {
    /// Retrieval tool announced the file it is writing
    Destination(String),
    /// Retrieval tool is muxing separate streams into this file
    MergedInto(String),
    /// Trim tool reported its final progress block
    TrimEnd,
}

/// Result of parsing one output line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    /// Stage-local progress in [0, 1]
    pub progress: Option<f64>,
    pub fragment: Option<MetadataFragment>,
}

impl ParsedLine {
    fn progress(value: f64) -> Self {
        Self {
            progress: Some(value.clamp(0.0, 1.0)),
            fragment: None,
        }
    }

    fn fragment(fragment: MetadataFragment) -> Self {
        Self {
            progress: None,
            fragment: Some(fragment),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.progress.is_none() && self.fragment.is_none()
    }
}

/// Parse a line from the retrieval tool's line-buffered progress output
pub fn parse_retrieval_line(line: &str) -> ParsedLine {
    if let Some(caps) = DOWNLOAD_PERCENT.captures(line) {
        return caps[1]
            .parse::<f64>()
            .map(|percent| ParsedLine::progress(percent / 100.0))
            .unwrap_or_default();
    }
    if let Some(caps) = DOWNLOAD_DESTINATION.captures(line) {
        return ParsedLine::fragment(MetadataFragment::Destination(caps[1].to_string()));
    }
    if let Some(caps) = MERGED_INTO.captures(line) {
        return ParsedLine::fragment(MetadataFragment::MergedInto(caps[1].to_string()));
    }
    ParsedLine::default()
}

/// Parse a `key=value` line from the trim tool's machine-readable progress
/// output against the requested clip duration in seconds.
pub fn parse_trim_line(line: &str, clip_duration: f64) -> ParsedLine {
    let Some((key, value)) = line.trim().split_once('=') else {
        return ParsedLine::default();
    };
    let value = value.trim();

    // out_time_ms carries microseconds as well, despite its name
    let elapsed = match key.trim() {
        "out_time_us" | "out_time_ms" => value.parse::<i64>().ok().map(|us| us as f64 / 1_000_000.0),
        "out_time" => parse_timestamp(value),
        "progress" if value == "end" => return ParsedLine::fragment(MetadataFragment::TrimEnd),
        _ => None,
    };

    match elapsed {
        Some(seconds) if clip_duration > 0.0 && seconds.is_finite() => {
            ParsedLine::progress((seconds / clip_duration).max(0.0))
        }
        _ => ParsedLine::default(),
    }
}

/// `HH:MM:SS.fraction`, possibly negative before the first frame
fn parse_timestamp(value: &str) -> Option<f64> {
    if let Some(rest) = value.strip_prefix('-') {
        return parse_timestamp(rest).map(|_| 0.0);
    }
    if value.matches(':').count() != 2 {
        return None;
    }
    TimeSpec::parse(value).ok().map(|t| t.seconds)
}
