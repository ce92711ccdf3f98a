//! Mapping from raw failures to the domain error taxonomy

use std::io;

use crate::domain::errors::{DomainError, RetrievalReason};
use crate::domain::model::ToolKind;
use crate::error::ClipError;

const ENOSPC: i32 = 28;

/// Ordered most-specific first; the first match wins
const RETRIEVAL_PATTERNS: &[(&str, RetrievalReason)] = &[
    ("private video", RetrievalReason::Private),
    ("video is private", RetrievalReason::Private),
    ("sign in to confirm your age", RetrievalReason::AgeRestricted),
    ("age-restricted", RetrievalReason::AgeRestricted),
    ("age restricted", RetrievalReason::AgeRestricted),
    ("inappropriate for some users", RetrievalReason::AgeRestricted),
    ("available in your country", RetrievalReason::GeoBlocked),
    ("blocked it in your country", RetrievalReason::GeoBlocked),
    ("geo restricted", RetrievalReason::GeoBlocked),
    ("geo-restricted", RetrievalReason::GeoBlocked),
    ("http error 404", RetrievalReason::NotFound),
    ("unsupported url", RetrievalReason::NotFound),
    ("does not exist", RetrievalReason::NotFound),
    ("video unavailable", RetrievalReason::Unavailable),
    ("this video is unavailable", RetrievalReason::Unavailable),
];

const NETWORK_PATTERNS: &[&str] = &[
    "unable to download webpage",
    "failed to resolve",
    "name or service not known",
    "temporary failure in name resolution",
    "nodename nor servname provided",
    "network is unreachable",
    "connection refused",
    "connection reset",
    "timed out",
];

const DISK_FULL_PATTERNS: &[&str] = &["no space left on device", "disk full"];

const PERMISSION_PATTERNS: &[&str] = &["permission denied", "operation not permitted"];

/// Classify a raw failure.
///
/// Precedence: toolchain presence, then tool output patterns, then generic
/// filesystem/network/process fallbacks. Anything unrecognised keeps its
/// message in `DomainError::Unknown`.
pub fn classify(error: &ClipError) -> DomainError {
    match error {
        ClipError::ToolMissing { tool, path } => DomainError::ToolMissing {
            tool: format!("{} ({})", tool, path.display()),
        },
        ClipError::ToolNotExecutable { tool, path } => DomainError::ToolNotExecutable {
            tool: format!("{} ({})", tool, path.display()),
        },
        ClipError::ToolFailed { tool, code, stderr } => classify_tool_output(*tool, *code, stderr),
        ClipError::TempDirectory { source } => {
            classify_io(source).unwrap_or_else(|| DomainError::TempDirectoryFailed(source.to_string()))
        }
        ClipError::Launch { source, .. } => match source.kind() {
            io::ErrorKind::NotFound => DomainError::ToolMissing {
                tool: error.to_string(),
            },
            io::ErrorKind::PermissionDenied => DomainError::ToolNotExecutable {
                tool: error.to_string(),
            },
            _ => DomainError::Unknown(error.to_string()),
        },
        ClipError::ProducedFileMissing { .. } | ClipError::OutputMissing { .. } => {
            DomainError::OutputFileMissing(error.to_string())
        }
        ClipError::Cancelled => DomainError::Cancelled,
        ClipError::Io { source, .. } => {
            classify_io(source).unwrap_or_else(|| DomainError::Unknown(error.to_string()))
        }
        ClipError::NameExhausted { .. } | ClipError::Config { .. } => {
            DomainError::Unknown(error.to_string())
        }
    }
}

fn classify_tool_output(tool: ToolKind, code: i32, stderr: &str) -> DomainError {
    let haystack = stderr.to_lowercase();
    let message = last_meaningful_line(stderr)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} exited with code {}", tool, code));

    match tool {
        ToolKind::Retrieval => {
            // Warnings (cache dirs, throttling) must not mask the real error
            let errors = error_lines(stderr).unwrap_or(haystack);
            if let Some((_, reason)) = RETRIEVAL_PATTERNS
                .iter()
                .find(|(pattern, _)| errors.contains(pattern))
            {
                return DomainError::RetrievalFailed {
                    reason: *reason,
                    message,
                };
            }
            if let Some(error) = classify_filesystem(&errors, &message) {
                return error;
            }
            if contains_any(&errors, NETWORK_PATTERNS) {
                return DomainError::NetworkUnavailable(message);
            }
            DomainError::RetrievalFailed {
                reason: RetrievalReason::Unavailable,
                message,
            }
        }
        ToolKind::Trim => classify_filesystem(&haystack, &message)
            .unwrap_or(DomainError::TrimFailed(message)),
    }
}

fn classify_filesystem(haystack: &str, message: &str) -> Option<DomainError> {
    if contains_any(haystack, DISK_FULL_PATTERNS) {
        return Some(DomainError::InsufficientDiskSpace);
    }
    if contains_any(haystack, PERMISSION_PATTERNS) {
        return Some(DomainError::PermissionDenied(message.to_string()));
    }
    None
}

/// Lowercased `ERROR:` lines, if the tool printed any
fn error_lines(stderr: &str) -> Option<String> {
    let lines: Vec<String> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:"))
        .map(str::to_lowercase)
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn classify_io(source: &io::Error) -> Option<DomainError> {
    if source.raw_os_error() == Some(ENOSPC) {
        return Some(DomainError::InsufficientDiskSpace);
    }
    match source.kind() {
        io::ErrorKind::PermissionDenied => Some(DomainError::PermissionDenied(source.to_string())),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::TimedOut => Some(DomainError::NetworkUnavailable(source.to_string())),
        _ => None,
    }
}

fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| haystack.contains(p))
}

/// Prefer the tool's own `ERROR:` line over trailing noise
fn last_meaningful_line(stderr: &str) -> Option<&str> {
    let lines = stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    lines
        .clone()
        .filter(|l| l.starts_with("ERROR:"))
        .last()
        .or_else(|| lines.last())
}
