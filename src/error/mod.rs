//! Error handling module for ClipFetch
//!
//! `ClipError` is the raw failure produced by the supervisor, the filesystem
//! and the toolchain checks. It never leaves the orchestrator unclassified;
//! see `engine::classifier` for the mapping into `DomainError`.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::model::ToolKind;

/// Raw failure type for ClipFetch operations
#[derive(Error, Debug)]
pub enum ClipError {
    /// External tool could not be found on disk or in PATH
    #[error("{tool} not found at {path}")]
    ToolMissing { tool: ToolKind, path: PathBuf },

    /// External tool exists but lacks execute permission
    #[error("{tool} at {path} is not executable")]
    ToolNotExecutable { tool: ToolKind, path: PathBuf },

    /// Temporary working directory could not be created
    #[error("Failed to create temporary directory: {source}")]
    TempDirectory {
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to start a process
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A tool ran and exited unsuccessfully
    #[error("{tool} exited with code {code}: {stderr}")]
    ToolFailed {
        tool: ToolKind,
        code: i32,
        stderr: String,
    },

    /// Retrieval reported success but left nothing matching the base name
    #[error("No downloaded file named {base_name}.* in {dir}")]
    ProducedFileMissing { base_name: String, dir: PathBuf },

    /// Trim reported success but the output is absent
    #[error("Output file missing after trim: {path}")]
    OutputMissing { path: PathBuf },

    /// Every candidate output name was taken
    #[error("No free file name for {path} after {attempts} attempts")]
    NameExhausted { path: PathBuf, attempts: usize },

    /// Run was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error with context
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ClipError {
    /// Attach context to an I/O error
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for ClipFetch operations
pub type ClipResult<T> = std::result::Result<T, ClipError>;
