// Clip interactor - Orchestrates the retrieve-then-trim job

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tempfile::TempDir;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::adapters::tracing_log;
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::classifier::classify;
use crate::engine::commands::{self, EncoderOptions, RetrievalOptions, SOURCE_BASE_NAME};
use crate::engine::progress::{parse_retrieval_line, parse_trim_line, MetadataFragment, ParsedLine};
use crate::error::{ClipError, ClipResult};
use crate::ports::*;
use crate::utils::path::locate_executable;
use crate::utils::Utils;


/// Stderr lines kept for error classification
const STDERR_TAIL_LINES: usize = 40;

/// Knobs the orchestrator needs from configuration
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub retriever: PathBuf,
    pub trimmer: PathBuf,
    pub retrieval: RetrievalOptions,
    pub section_padding_secs: f64,
    pub encoders: EncoderOptions,
    pub log_capacity: usize,
    pub name_probe_limit: usize,
    /// Parent of per-job temp directories; system temp dir when `None`
    pub temp_root: Option<PathBuf>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            retriever: PathBuf::from("yt-dlp"),
            trimmer: PathBuf::from("ffmpeg"),
            retrieval: RetrievalOptions::default(),
            section_padding_secs: 5.0,
            encoders: EncoderOptions::default(),
            log_capacity: LogBook::DEFAULT_CAPACITY,
            name_probe_limit: 1000,
            temp_root: None,
        }
    }
}

/// How a call to [`ClipOrchestrator::start`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Finished(JobResult),
    Failed(DomainError),
    Canceled,
    /// Another job was still active; nothing was started
    Rejected { current: JobStage },
}

impl JobOutcome {
    pub fn stage(&self) -> Option<JobStage> {
        match self {
            JobOutcome::Finished(_) => Some(JobStage::Finished),
            JobOutcome::Failed(_) => Some(JobStage::Failed),
            JobOutcome::Canceled => Some(JobStage::Canceled),
            JobOutcome::Rejected { .. } => None,
        }
    }
}

/// Resolved executables for one job
struct Toolchain {
    retriever: PathBuf,
    trimmer: PathBuf,
}

/// Bounded tail of a process's stderr
#[derive(Default)]
struct StderrTail(VecDeque<String>);

impl StderrTail {
    fn push(&mut self, line: String) {
        if self.0.len() == STDERR_TAIL_LINES {
            self.0.pop_front();
        }
        self.0.push_back(line);
    }

    fn joined(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Drives one clip job at a time through retrieval and trimming.
///
/// All job state lives in a [`JobSnapshot`] published over a watch channel;
/// `subscribe` and `snapshot` are the only read paths. A cancel that lands
/// while a stage is running is authoritative: later stage transitions,
/// results and failures are discarded.
pub struct ClipOrchestrator {
    process: Arc<dyn ProcessPort>,
    naming: Arc<dyn NamingPort>,
    settings: OrchestratorSettings,
    state: watch::Sender<JobSnapshot>,
    active: Mutex<Option<CancellationToken>>,
}

impl ClipOrchestrator {
    /// Create new orchestrator with injected ports
    pub fn new(
        process: Arc<dyn ProcessPort>,
        naming: Arc<dyn NamingPort>,
        settings: OrchestratorSettings,
    ) -> Self {
        let (state, _) = watch::channel(JobSnapshot::new(settings.log_capacity));
        Self {
            process,
            naming,
            settings,
            state,
            active: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Observe every published state change
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.state.subscribe()
    }

    /// Current state, cloned
    pub fn snapshot(&self) -> JobSnapshot {
        self.state.borrow().clone()
    }

    /// Run a job to a terminal stage.
    ///
    /// Returns `Rejected` without touching the current job when one is still
    /// active or the stage does not allow a new start.
    pub async fn start(&self, request: ClipRequest) -> JobOutcome {
        let (job_id, cancel) = match self.accept() {
            Ok(accepted) => accepted,
            Err(current) => {
                self.log(
                    LogSeverity::Warning,
                    format!("Start ignored: previous job has not settled (stage {})", current),
                );
                return JobOutcome::Rejected { current };
            }
        };
        info!(%job_id, url = %request.url, "Clip job accepted");

        let outcome = self.run_job(&request, &cancel).await;

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
        info!(%job_id, stage = ?outcome.stage(), "Clip job ended");
        outcome
    }

    /// Cancel the running job. Returns false when no stage is running.
    pub fn cancel(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(token) = active.as_ref() else {
            return false;
        };

        let canceled = self.state.send_if_modified(|s| {
            if !s.stage.is_running() {
                return false;
            }
            s.stage = JobStage::Canceled;
            s.trail.push(JobStage::Canceled);
            s.stage_progress = 0.0;
            s.overall_progress = overall_progress(JobStage::Canceled, 0.0);
            token.cancel();
            true
        });
        drop(active);

        if canceled {
            self.log(LogSeverity::Warning, "Job canceled");
        }
        canceled
    }

    fn accept(&self) -> Result<(Uuid, CancellationToken), JobStage> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.state.borrow().stage;
        if active.is_some() || !current.can_start() {
            return Err(current);
        }

        let job_id = Uuid::new_v4();
        let token = CancellationToken::new();
        *active = Some(token.clone());

        let capacity = self.settings.log_capacity;
        self.state.send_modify(|s| {
            *s = JobSnapshot::new(capacity);
            s.job_id = Some(job_id);
        });
        Ok((job_id, token))
    }

    async fn run_job(&self, request: &ClipRequest, cancel: &CancellationToken) -> JobOutcome {
        let window = match validate_request(request) {
            Ok(window) => window,
            Err(error) => return self.fail(error),
        };

        let tools = match self.locate_tools() {
            Ok(tools) => tools,
            Err(error) => return self.fail(classify(&error)),
        };

        let workspace = match self.create_workspace() {
            Ok(dir) => dir,
            Err(error) => return self.fail(classify(&error)),
        };
        debug!(dir = %workspace.path().display(), "Created job workspace");

        let mut output: Option<PathBuf> = None;
        let result = self
            .run_stages(request, &window, &tools, workspace.path(), cancel, &mut output)
            .await;

        let workspace_path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            self.log(
                LogSeverity::Warning,
                format!(
                    "Failed to remove temporary directory {}: {}",
                    workspace_path.display(),
                    e
                ),
            );
        }

        if cancel.is_cancelled() {
            self.discard_output(output.as_deref()).await;
            return JobOutcome::Canceled;
        }

        match result {
            Ok(job_result) => {
                if self.finish(job_result.clone()) {
                    JobOutcome::Finished(job_result)
                } else {
                    self.discard_output(output.as_deref()).await;
                    JobOutcome::Canceled
                }
            }
            Err(error) => {
                self.discard_output(output.as_deref()).await;
                let outcome = self.fail(classify(&error));
                if self.state.borrow().stage == JobStage::Canceled {
                    JobOutcome::Canceled
                } else {
                    outcome
                }
            }
        }
    }

    async fn run_stages(
        &self,
        request: &ClipRequest,
        window: &ClipWindow,
        tools: &Toolchain,
        workspace: &Path,
        cancel: &CancellationToken,
        output: &mut Option<PathBuf>,
    ) -> ClipResult<JobResult> {
        if !self.enter(JobStage::Retrieving) {
            return Err(ClipError::Cancelled);
        }
        self.log(LogSeverity::Info, format!("Retrieving {}", request.url.trim()));

        let retrieval_started = Instant::now();
        let metadata = self.probe_metadata(request, tools, workspace, cancel).await?;

        let section = request
            .download_sections
            .then(|| SectionWindow::around(window, self.settings.section_padding_secs));
        if let Some(section) = &section {
            self.log(
                LogSeverity::Info,
                format!("Fetching section {} - {}", section.from, section.to),
            );
        }

        let retrieval_progress = self
            .retrieve(request, tools, workspace, section.as_ref(), cancel)
            .await?;
        let source = locate_source(workspace)?;
        let retrieval_elapsed = retrieval_started.elapsed();
        self.log(
            LogSeverity::Success,
            format!(
                "Retrieved {} in {}",
                file_name_of(&source),
                Utils::format_duration(retrieval_elapsed)
            ),
        );

        if !self.enter(JobStage::Trimming) {
            return Err(ClipError::Cancelled);
        }

        let context = NamingContext {
            metadata: metadata.clone(),
            window: Some(*window),
            quality: Some(request.quality),
        };
        let stem = self.naming.render(&request.filename_template, &context);
        let file_name = format!("{}.{}", stem, request.container.extension());
        let target = self.naming.resolve_available(
            &request.output_folder,
            &file_name,
            self.settings.name_probe_limit,
        )?;
        self.log(LogSeverity::Info, format!("Trimming to {}", target.display()));

        let plan = TrimPlan::new(window, section.as_ref());
        let trim_started = Instant::now();
        let trim_progress = self
            .trim(request, tools, &source, &target, &plan, workspace, cancel, output)
            .await?;
        let trim_elapsed = trim_started.elapsed();

        let size_bytes = match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(ClipError::OutputMissing { path: target }),
        };
        self.log(
            LogSeverity::Success,
            format!(
                "Saved {} ({}) in {}",
                target.display(),
                Utils::format_file_size(size_bytes),
                Utils::format_duration(trim_elapsed)
            ),
        );

        Ok(JobResult {
            output_path: target,
            size_bytes,
            progress: StageProgress {
                retrieval: retrieval_progress,
                trim: trim_progress,
            },
            retrieval_secs: retrieval_elapsed.as_secs_f64(),
            trim_secs: trim_elapsed.as_secs_f64(),
            metadata,
        })
    }

    fn locate_tools(&self) -> ClipResult<Toolchain> {
        let retriever = locate_executable(ToolKind::Retrieval, &self.settings.retriever)?;
        let trimmer = locate_executable(ToolKind::Trim, &self.settings.trimmer)?;
        debug!(retriever = %retriever.display(), trimmer = %trimmer.display(), "Toolchain resolved");
        Ok(Toolchain { retriever, trimmer })
    }

    fn create_workspace(&self) -> ClipResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("clipfetch-");
        let created = match &self.settings.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        created.map_err(|source| ClipError::TempDirectory { source })
    }

    /// Best-effort metadata dump. Only cancellation is an error here.
    async fn probe_metadata(
        &self,
        request: &ClipRequest,
        tools: &Toolchain,
        workspace: &Path,
        cancel: &CancellationToken,
    ) -> ClipResult<Option<VideoMetadata>> {
        let spec = ProcessSpec::new(tools.retriever.clone())
            .args(commands::probe_args(&request.url, &self.settings.retrieval))
            .current_dir(workspace);

        let mut stdout = String::new();
        let mut stderr = StderrTail::default();
        let outcome = self
            .process
            .run(&spec, cancel, &mut |line: OutputLine| match line.stream {
                OutputStream::Stdout => {
                    stdout.push_str(&line.text);
                    stdout.push('\n');
                }
                OutputStream::Stderr => stderr.push(line.text),
            })
            .await;

        let failure = match outcome {
            Ok(ProcessOutcome::Cancelled) => return Err(ClipError::Cancelled),
            Ok(ProcessOutcome::Exited(0)) => match serde_json::from_str::<VideoMetadata>(&stdout) {
                Ok(metadata) => {
                    if let Some(title) = &metadata.title {
                        self.log(LogSeverity::Info, format!("Title: {}", title));
                    }
                    return Ok(Some(metadata));
                }
                Err(e) => format!("unreadable metadata: {}", e),
            },
            Ok(ProcessOutcome::Exited(code)) => {
                let detail = stderr.joined();
                format!("exit code {}{}", code, tail_suffix(&detail))
            }
            Err(e) => e.to_string(),
        };

        self.log(
            LogSeverity::Warning,
            format!("Metadata probe failed ({}); continuing without it", failure),
        );
        Ok(None)
    }

    async fn retrieve(
        &self,
        request: &ClipRequest,
        tools: &Toolchain,
        workspace: &Path,
        section: Option<&SectionWindow>,
        cancel: &CancellationToken,
    ) -> ClipResult<f64> {
        let spec = ProcessSpec::new(tools.retriever.clone())
            .args(commands::retrieval_args(
                request,
                workspace,
                section,
                &self.settings.retrieval,
            ))
            .current_dir(workspace)
            .env("PYTHONUNBUFFERED", "1");

        let mut gate = ProgressGate::new();
        let mut stderr = StderrTail::default();
        let outcome = self
            .process
            .run(&spec, cancel, &mut |line: OutputLine| {
                let parsed = parse_retrieval_line(&line.text);
                self.apply(JobStage::Retrieving, &mut gate, &parsed);
                if line.stream == OutputStream::Stderr {
                    if line.text.starts_with("ERROR:") {
                        self.log(LogSeverity::Error, line.text.clone());
                    }
                    stderr.push(line.text);
                }
            })
            .await?;

        match outcome {
            ProcessOutcome::Cancelled => Err(ClipError::Cancelled),
            ProcessOutcome::Exited(0) => {
                if let Some(value) = gate.advance(1.0) {
                    self.set_progress(JobStage::Retrieving, value);
                }
                Ok(gate.current())
            }
            ProcessOutcome::Exited(code) => Err(ClipError::ToolFailed {
                tool: ToolKind::Retrieval,
                code,
                stderr: stderr.joined(),
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn trim(
        &self,
        request: &ClipRequest,
        tools: &Toolchain,
        source: &Path,
        target: &Path,
        plan: &TrimPlan,
        workspace: &Path,
        cancel: &CancellationToken,
        written: &mut Option<PathBuf>,
    ) -> ClipResult<f64> {
        let spec = ProcessSpec::new(tools.trimmer.clone())
            .args(commands::trim_args(
                source,
                target,
                plan,
                request,
                &self.settings.encoders,
            ))
            .current_dir(workspace);

        let clip_duration = plan.duration();
        let mut gate = ProgressGate::new();
        let mut stderr = StderrTail::default();
        let outcome = self
            .process
            .run(&spec, cancel, &mut |line: OutputLine| match line.stream {
                OutputStream::Stdout => {
                    // Progress is only reported once the tool has opened the
                    // output, which `-n` refuses to do for an existing file
                    if written.is_none() {
                        *written = Some(target.to_path_buf());
                    }
                    let parsed = parse_trim_line(&line.text, clip_duration);
                    self.apply(JobStage::Trimming, &mut gate, &parsed);
                }
                OutputStream::Stderr => stderr.push(line.text),
            })
            .await?;

        match outcome {
            ProcessOutcome::Cancelled => Err(ClipError::Cancelled),
            ProcessOutcome::Exited(0) => {
                written.get_or_insert_with(|| target.to_path_buf());
                if let Some(value) = gate.advance(1.0) {
                    self.set_progress(JobStage::Trimming, value);
                }
                Ok(gate.current())
            }
            ProcessOutcome::Exited(code) => Err(ClipError::ToolFailed {
                tool: ToolKind::Trim,
                code,
                stderr: stderr.joined(),
            }),
        }
    }

    fn apply(&self, stage: JobStage, gate: &mut ProgressGate, parsed: &ParsedLine) {
        if let Some(value) = parsed.progress.and_then(|p| gate.advance(p)) {
            self.set_progress(stage, value);
        }
        match &parsed.fragment {
            Some(MetadataFragment::Destination(path)) => {
                self.log(LogSeverity::Debug, format!("Writing {}", path))
            }
            Some(MetadataFragment::MergedInto(path)) => {
                self.log(LogSeverity::Debug, format!("Merging formats into {}", path))
            }
            Some(MetadataFragment::TrimEnd) => self.log(LogSeverity::Debug, "Trim tool finished"),
            None => {}
        }
    }

    /// Remove output the trim tool wrote for this job; `None` when it never opened one
    async fn discard_output(&self, output: Option<&Path>) {
        let Some(path) = output else { return };
        match tokio::fs::remove_file(path).await {
            Ok(()) => self.log(
                LogSeverity::Info,
                format!("Removed partial output {}", path.display()),
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.log(
                LogSeverity::Warning,
                format!("Failed to remove partial output {}: {}", path.display(), e),
            ),
        }
    }

    /// Move to a new stage unless the job was canceled meanwhile
    fn enter(&self, stage: JobStage) -> bool {
        self.state.send_if_modified(|s| {
            if s.stage == JobStage::Canceled {
                return false;
            }
            s.stage = stage;
            s.trail.push(stage);
            s.stage_progress = 0.0;
            s.overall_progress = overall_progress(stage, 0.0);
            true
        })
    }

    fn set_progress(&self, stage: JobStage, value: f64) {
        self.state.send_if_modified(|s| {
            if s.stage != stage {
                return false;
            }
            s.stage_progress = value;
            s.overall_progress = overall_progress(stage, value);
            true
        });
    }

    fn finish(&self, result: JobResult) -> bool {
        self.state.send_if_modified(|s| {
            if s.stage == JobStage::Canceled {
                return false;
            }
            s.stage = JobStage::Finished;
            s.trail.push(JobStage::Finished);
            s.stage_progress = 1.0;
            s.overall_progress = overall_progress(JobStage::Finished, 1.0);
            s.result = Some(result);
            true
        })
    }

    fn fail(&self, error: DomainError) -> JobOutcome {
        let recorded = self.state.send_if_modified(|s| {
            if s.stage == JobStage::Canceled {
                return false;
            }
            s.stage = JobStage::Failed;
            s.trail.push(JobStage::Failed);
            s.stage_progress = 0.0;
            s.overall_progress = overall_progress(JobStage::Failed, 0.0);
            s.error = Some(error.clone());
            true
        });
        if recorded {
            self.log(LogSeverity::Error, error.to_string());
        }
        JobOutcome::Failed(error)
    }

    fn log(&self, severity: LogSeverity, message: impl Into<String>) {
        let message = message.into();
        tracing_log::emit(severity, &message);
        self.state.send_modify(|s| s.log.push(severity, message));
    }
}

/// Find the retrieved file; the tool may have picked another extension
fn locate_source(workspace: &Path) -> ClipResult<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(workspace)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.file_stem()
                .is_some_and(|stem| stem == SOURCE_BASE_NAME)
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ClipError::ProducedFileMissing {
            base_name: SOURCE_BASE_NAME.to_string(),
            dir: workspace.to_path_buf(),
        })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn tail_suffix(detail: &str) -> String {
    detail
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| format!(": {}", line.trim()))
        .unwrap_or_default()
}
