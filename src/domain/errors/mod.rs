// Domain errors - Error taxonomy surfaced to callers

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a retrieval failed, as far as the tool output tells us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalReason {
    NotFound,
    Private,
    AgeRestricted,
    GeoBlocked,
    Unavailable,
}

impl fmt::Display for RetrievalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RetrievalReason::NotFound => "video not found",
            RetrievalReason::Private => "video is private",
            RetrievalReason::AgeRestricted => "video is age-restricted",
            RetrievalReason::GeoBlocked => "video is not available in your region",
            RetrievalReason::Unavailable => "video is unavailable",
        };
        f.write_str(text)
    }
}

/// Domain-specific error kinds
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DomainError {
    /// A required external tool is not installed
    #[error("{tool} is not installed or could not be found")]
    ToolMissing { tool: String },
    /// A required external tool cannot be executed
    #[error("{tool} is not executable")]
    ToolNotExecutable { tool: String },
    /// The request did not pass validation
    #[error("Invalid request: {0}")]
    ValidationFailed(String),
    /// Temporary working storage could not be prepared
    #[error("Could not create temporary directory: {0}")]
    TempDirectoryFailed(String),
    /// The retrieval tool failed
    #[error("Download failed: {reason} ({message})")]
    RetrievalFailed {
        reason: RetrievalReason,
        message: String,
    },
    /// An expected file is absent
    #[error("Expected file is missing: {0}")]
    OutputFileMissing(String),
    /// The trim tool failed
    #[error("Trimming failed: {0}")]
    TrimFailed(String),
    /// Destination volume is full
    #[error("Not enough disk space")]
    InsufficientDiskSpace,
    /// Access denied on the filesystem
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Network is unreachable or timed out
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),
    /// The job was cancelled
    #[error("Cancelled")]
    Cancelled,
    /// Anything else, with the original message
    #[error("{0}")]
    Unknown(String),
}

/// How loudly a UI should surface an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DomainError {
    /// Severity derived from the error kind
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DomainError::Cancelled => ErrorSeverity::Low,
            DomainError::ValidationFailed(_) | DomainError::NetworkUnavailable(_) => {
                ErrorSeverity::Medium
            }
            DomainError::RetrievalFailed { reason, .. } => match reason {
                RetrievalReason::Unavailable => ErrorSeverity::High,
                _ => ErrorSeverity::Medium,
            },
            DomainError::OutputFileMissing(_)
            | DomainError::TrimFailed(_)
            | DomainError::PermissionDenied(_)
            | DomainError::TempDirectoryFailed(_)
            | DomainError::Unknown(_) => ErrorSeverity::High,
            DomainError::ToolMissing { .. }
            | DomainError::ToolNotExecutable { .. }
            | DomainError::InsufficientDiskSpace => ErrorSeverity::Critical,
        }
    }

    /// Whether this error is about the installed toolchain
    pub fn is_toolchain_error(&self) -> bool {
        matches!(
            self,
            DomainError::ToolMissing { .. } | DomainError::ToolNotExecutable { .. }
        )
    }
}
