// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::model::*;
use crate::error::ClipResult;

/// One external process invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Working directory; inherits the caller's when `None`
    pub cwd: Option<PathBuf>,
    /// Variables layered over the inherited environment
    pub env: Vec<(String, String)>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A single line of process output, without its terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

/// How a supervised run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Process exited on its own; signal deaths report -1
    Exited(i32),
    /// Run ended because the cancellation token fired
    Cancelled,
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Exited(0))
    }
}

/// Port for launching and supervising external tools
#[async_trait]
pub trait ProcessPort: Send + Sync {
    /// Run the process to completion, handing every output line to `on_line`.
    ///
    /// Lines of one stream arrive in emission order. Fails only when the
    /// process cannot be launched; cancellation resolves to
    /// `ProcessOutcome::Cancelled` once the process is gone.
    async fn run(
        &self,
        spec: &ProcessSpec,
        cancel: &CancellationToken,
        on_line: &mut (dyn FnMut(OutputLine) + Send),
    ) -> ClipResult<ProcessOutcome>;
}

/// Values available to filename templates
#[derive(Debug, Clone, Default)]
pub struct NamingContext {
    pub metadata: Option<VideoMetadata>,
    pub window: Option<ClipWindow>,
    pub quality: Option<QualityTier>,
}

/// Port for output file naming
pub trait NamingPort: Send + Sync {
    /// Render a template into a bare file stem (no extension, no directory)
    fn render(&self, template: &str, context: &NamingContext) -> String;

    /// Return a path under `folder` that does not exist yet
    fn resolve_available(&self, folder: &Path, file_name: &str, limit: usize) -> ClipResult<PathBuf>;
}
