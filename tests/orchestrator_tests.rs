//! Orchestrator scenarios against a scripted process port

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use clipfetch::adapters::TemplateNamer;
use clipfetch::domain::errors::{DomainError, RetrievalReason};
use clipfetch::domain::model::*;
use clipfetch::error::ClipResult;
use clipfetch::ports::*;
use clipfetch::{ClipOrchestrator, JobOutcome, OrchestratorSettings};

/// Test utilities for scripted tool runs
mod test_utils {
    use super::*;

    pub const METADATA_JSON: &str =
        r#"{"id":"abc123","title":"Demo Clip","uploader":"Someone","duration":300.0,"formats":[]}"#;

    #[derive(Debug, Clone)]
    pub enum Probe {
        Metadata,
        Fail,
    }

    #[derive(Debug, Clone)]
    pub enum Retrieval {
        /// Writes `source.<ext>` after a few progress lines
        Produce(&'static str),
        /// Exits successfully without writing anything
        ProduceNothing,
        Fail { code: i32, stderr: &'static str },
        /// Runs until cancelled
        Hang,
    }

    #[derive(Debug, Clone)]
    pub enum Trim {
        Produce,
        Fail { code: i32, stderr: &'static str },
        /// Writes part of the output, then runs until cancelled
        Hang,
        /// Another process creates the output first and the tool refuses to overwrite it
        Preempted,
    }

    pub struct ScriptedTools {
        pub probe: Probe,
        pub retrieval: Retrieval,
        pub trim: Trim,
        pub calls: Mutex<Vec<ProcessSpec>>,
    }

    impl ScriptedTools {
        pub fn new(probe: Probe, retrieval: Retrieval, trim: Trim) -> Self {
            Self {
                probe,
                retrieval,
                trim,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<ProcessSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_for(&self, tool: &str) -> Option<ProcessSpec> {
            self.calls()
                .into_iter()
                .filter(|spec| !spec.args.iter().any(|a| a == "--dump-single-json"))
                .find(|spec| spec.program.ends_with(tool))
        }
    }

    fn stdout(text: &str) -> OutputLine {
        OutputLine {
            stream: OutputStream::Stdout,
            text: text.to_string(),
        }
    }

    fn stderr(text: &str) -> OutputLine {
        OutputLine {
            stream: OutputStream::Stderr,
            text: text.to_string(),
        }
    }

    fn fail_lines(code: i32, text: &str, on_line: &mut (dyn FnMut(OutputLine) + Send)) -> ProcessOutcome {
        for line in text.lines() {
            on_line(stderr(line));
        }
        ProcessOutcome::Exited(code)
    }

    async fn until_cancelled(cancel: &CancellationToken) -> ProcessOutcome {
        tokio::select! {
            _ = cancel.cancelled() => ProcessOutcome::Cancelled,
            _ = tokio::time::sleep(Duration::from_secs(10)) => ProcessOutcome::Exited(1),
        }
    }

    fn output_template(spec: &ProcessSpec) -> String {
        let at = spec.args.iter().position(|a| a == "-o").expect("-o flag");
        spec.args[at + 1].clone()
    }

    #[async_trait]
    impl ProcessPort for ScriptedTools {
        async fn run(
            &self,
            spec: &ProcessSpec,
            cancel: &CancellationToken,
            on_line: &mut (dyn FnMut(OutputLine) + Send),
        ) -> ClipResult<ProcessOutcome> {
            self.calls.lock().unwrap().push(spec.clone());

            if spec.args.iter().any(|a| a == "--dump-single-json") {
                return Ok(match self.probe {
                    Probe::Metadata => {
                        on_line(stdout(METADATA_JSON));
                        ProcessOutcome::Exited(0)
                    }
                    Probe::Fail => fail_lines(1, "ERROR: Unable to extract uploader id", on_line),
                });
            }

            if spec.program.ends_with("yt-dlp") {
                return Ok(match &self.retrieval {
                    Retrieval::Produce(ext) => {
                        on_line(stdout("[download] Destination: source.f137.mp4"));
                        on_line(stdout("[download]  10.0% of 20.00MiB at 2.00MiB/s ETA 00:09"));
                        on_line(stdout("[download]  55.5% of 20.00MiB at 2.00MiB/s ETA 00:04"));
                        on_line(stdout("[download]  40.0% of 20.00MiB at 2.00MiB/s ETA 00:06"));
                        on_line(stderr("WARNING: some harmless warning"));
                        on_line(stdout("[download] 100% of 20.00MiB in 00:10"));
                        let target = output_template(spec).replace("%(ext)s", ext);
                        std::fs::write(&target, b"retrieved media").unwrap();
                        on_line(stdout(&format!("[Merger] Merging formats into \"{}\"", target)));
                        ProcessOutcome::Exited(0)
                    }
                    Retrieval::ProduceNothing => ProcessOutcome::Exited(0),
                    Retrieval::Fail { code, stderr } => fail_lines(*code, stderr, on_line),
                    Retrieval::Hang => {
                        on_line(stdout("[download]   3.0% of 20.00MiB"));
                        let partial = output_template(spec).replace("%(ext)s", "mp4.part");
                        std::fs::write(partial, b"partial").unwrap();
                        until_cancelled(cancel).await
                    }
                });
            }

            let output = PathBuf::from(spec.args.last().expect("trim output"));
            Ok(match &self.trim {
                Trim::Produce => {
                    on_line(stdout("out_time_us=15000000"));
                    on_line(stdout("progress=continue"));
                    on_line(stdout("out_time=00:00:45.000000"));
                    on_line(stdout("out_time_us=30000000"));
                    std::fs::write(&output, b"clipped media").unwrap();
                    on_line(stdout("out_time_us=60000000"));
                    on_line(stdout("progress=end"));
                    ProcessOutcome::Exited(0)
                }
                Trim::Fail { code, stderr } => fail_lines(*code, stderr, on_line),
                Trim::Preempted => {
                    std::fs::write(&output, b"someone else's clip").unwrap();
                    let refusal = format!(
                        "File '{}' already exists. Exiting.",
                        output.display()
                    );
                    fail_lines(1, &refusal, on_line)
                }
                Trim::Hang => {
                    std::fs::write(&output, b"half a clip").unwrap();
                    on_line(stdout("out_time_us=1000000"));
                    until_cancelled(cancel).await
                }
            })
        }
    }

    /// Scratch folders plus executable stand-ins for both tools
    pub struct Harness {
        pub tools_dir: TempDir,
        pub temp_root: TempDir,
        pub out_dir: TempDir,
    }

    impl Harness {
        pub fn new() -> Self {
            let tools_dir = TempDir::new().unwrap();
            for name in ["yt-dlp", "ffmpeg"] {
                let path = tools_dir.path().join(name);
                std::fs::write(&path, b"#!/bin/sh\nexit 0\n").unwrap();
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
                }
            }
            Self {
                tools_dir,
                temp_root: TempDir::new().unwrap(),
                out_dir: TempDir::new().unwrap(),
            }
        }

        pub fn settings(&self) -> OrchestratorSettings {
            OrchestratorSettings {
                retriever: self.tools_dir.path().join("yt-dlp"),
                trimmer: self.tools_dir.path().join("ffmpeg"),
                temp_root: Some(self.temp_root.path().to_path_buf()),
                ..OrchestratorSettings::default()
            }
        }

        pub fn orchestrator(&self, tools: Arc<ScriptedTools>) -> Arc<ClipOrchestrator> {
            self.orchestrator_with(tools, self.settings())
        }

        pub fn orchestrator_with(
            &self,
            tools: Arc<ScriptedTools>,
            settings: OrchestratorSettings,
        ) -> Arc<ClipOrchestrator> {
            Arc::new(ClipOrchestrator::new(
                tools as Arc<dyn ProcessPort>,
                Arc::new(TemplateNamer::new()) as Arc<dyn NamingPort>,
                settings,
            ))
        }

        pub fn request(&self, start: &str, end: &str) -> ClipRequest {
            ClipRequest {
                url: "https://www.example.com/watch?v=abc123".to_string(),
                start: start.to_string(),
                end: end.to_string(),
                quality: QualityTier::High,
                container: Container::Mp4,
                accuracy: Accuracy::Fast,
                video_mbps: None,
                audio_kbps: None,
                output_folder: self.out_dir.path().to_path_buf(),
                filename_template: "{title}".to_string(),
                download_sections: false,
            }
        }

        pub fn temp_root_is_empty(&self) -> bool {
            dir_is_empty(self.temp_root.path())
        }

        pub fn out_dir_is_empty(&self) -> bool {
            dir_is_empty(self.out_dir.path())
        }
    }

    pub fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    pub async fn wait_for_stage(orchestrator: &ClipOrchestrator, stage: JobStage) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while orchestrator.snapshot().stage != stage {
            assert!(
                tokio::time::Instant::now() < deadline,
                "stage {} never reached",
                stage
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

use test_utils::*;

#[tokio::test]
async fn test_frame_accurate_mp4_finishes() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Produce,
    ));
    let orchestrator = harness.orchestrator(tools.clone());

    let mut updates = orchestrator.subscribe();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            seen.push((snapshot.stage, snapshot.overall_progress));
            if snapshot.stage.is_terminal() {
                break;
            }
        }
        seen
    });

    let mut request = harness.request("10", "70");
    request.accuracy = Accuracy::FrameAccurate;
    let outcome = orchestrator.start(request).await;

    let JobOutcome::Finished(result) = outcome else {
        panic!("expected finished, got {:?}", outcome);
    };
    assert_eq!(result.output_path, harness.out_dir.path().join("Demo Clip.mp4"));
    assert!(result.output_path.is_file());
    assert_eq!(result.output_path.extension().unwrap(), "mp4");
    assert_eq!(result.size_bytes, b"clipped media".len() as u64);
    assert_eq!(result.metadata.as_ref().unwrap().id.as_deref(), Some("abc123"));
    assert_eq!(result.progress.retrieval, 1.0);
    assert_eq!(result.progress.trim, 1.0);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.stage, JobStage::Finished);
    assert_eq!(snapshot.overall_progress, 1.0);
    assert_eq!(
        snapshot.trail,
        vec![
            JobStage::Idle,
            JobStage::Retrieving,
            JobStage::Trimming,
            JobStage::Finished
        ]
    );
    assert!(snapshot.error.is_none());
    assert!(harness.temp_root_is_empty());

    let seen = tokio::time::timeout(Duration::from_secs(5), observer)
        .await
        .unwrap()
        .unwrap();
    assert!(seen
        .windows(2)
        .all(|pair| pair[1].1 >= pair[0].1 || pair[1].0 != pair[0].0));
    assert!(seen
        .iter()
        .filter(|(stage, _)| *stage == JobStage::Retrieving)
        .all(|(_, overall)| *overall <= 0.6));

    let trim = tools.call_for("ffmpeg").unwrap();
    let args = trim.args.join(" ");
    assert!(args.contains("-ss 00:00:10.000"));
    assert!(args.contains("-to 00:01:10.000"));
    assert!(args.contains("-b:v 8000k"));
    assert!(args.contains("-maxrate 12000k"));
    assert!(args.contains("-movflags +faststart"));
    assert!(!args.contains("-c copy"));

    let retrieval = tools.call_for("yt-dlp").unwrap();
    assert!(retrieval.args.contains(&"bestvideo[height<=1080]+bestaudio/best[height<=1080]/best".to_string()));
    assert!(retrieval.env.contains(&("PYTHONUNBUFFERED".to_string(), "1".to_string())));
}

#[tokio::test]
async fn test_private_video_fails_with_reason() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Fail,
        Retrieval::Fail {
            code: 1,
            stderr: "WARNING: [youtube] falling back\nERROR: [youtube] abc123: Private video. Sign in if you've been granted access to this video",
        },
        Trim::Produce,
    ));
    let orchestrator = harness.orchestrator(tools.clone());

    let outcome = orchestrator.start(harness.request("10", "70")).await;

    match &outcome {
        JobOutcome::Failed(DomainError::RetrievalFailed { reason, message }) => {
            assert_eq!(*reason, RetrievalReason::Private);
            assert!(message.starts_with("ERROR:"));
        }
        other => panic!("expected private retrieval failure, got {:?}", other),
    }
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.stage, JobStage::Failed);
    assert!(matches!(snapshot.error, Some(DomainError::RetrievalFailed { .. })));
    assert!(tools.call_for("ffmpeg").is_none());
    assert!(harness.temp_root_is_empty());
    assert!(harness.out_dir_is_empty());
}

#[tokio::test]
async fn test_cancel_while_retrieving() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(Probe::Metadata, Retrieval::Hang, Trim::Produce));
    let orchestrator = harness.orchestrator(tools);

    let job = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        let request = harness.request("10", "70");
        async move { orchestrator.start(request).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orchestrator.snapshot().stage, JobStage::Retrieving);
    assert!(orchestrator.cancel());
    assert_eq!(orchestrator.snapshot().stage, JobStage::Canceled);

    let outcome = tokio::time::timeout(Duration::from_secs(3), job)
        .await
        .expect("cancel settles within the grace period")
        .unwrap();
    assert_eq!(outcome, JobOutcome::Canceled);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.stage, JobStage::Canceled);
    assert_eq!(snapshot.overall_progress, 0.0);
    assert!(snapshot.result.is_none());
    assert!(harness.temp_root_is_empty());
    assert!(harness.out_dir_is_empty());

    // A settled job does not accept a second cancel
    assert!(!orchestrator.cancel());
}

#[tokio::test]
async fn test_cancel_while_trimming_removes_partial_output() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Hang,
    ));
    let orchestrator = harness.orchestrator(tools);

    let job = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        let request = harness.request("10", "70");
        async move { orchestrator.start(request).await }
    });

    wait_for_stage(&orchestrator, JobStage::Trimming).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(orchestrator.cancel());

    let outcome = tokio::time::timeout(Duration::from_secs(3), job)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome, JobOutcome::Canceled);
    assert!(harness.out_dir_is_empty());
    assert!(harness.temp_root_is_empty());
    assert_eq!(
        orchestrator.snapshot().trail,
        vec![
            JobStage::Idle,
            JobStage::Retrieving,
            JobStage::Trimming,
            JobStage::Canceled
        ]
    );
}

#[tokio::test]
async fn test_existing_output_gets_numbered_suffix() {
    let harness = Harness::new();
    std::fs::write(harness.out_dir.path().join("Demo Clip.mp4"), b"older clip").unwrap();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Produce,
    ));
    let orchestrator = harness.orchestrator(tools);

    let outcome = orchestrator.start(harness.request("10", "70")).await;

    let JobOutcome::Finished(result) = outcome else {
        panic!("expected finished, got {:?}", outcome);
    };
    assert_eq!(result.output_path, harness.out_dir.path().join("Demo Clip (1).mp4"));
    assert_eq!(
        std::fs::read(harness.out_dir.path().join("Demo Clip.mp4")).unwrap(),
        b"older clip"
    );
}

#[tokio::test]
async fn test_start_rejected_while_running() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(Probe::Metadata, Retrieval::Hang, Trim::Produce));
    let orchestrator = harness.orchestrator(tools.clone());

    let job = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        let request = harness.request("10", "70");
        async move { orchestrator.start(request).await }
    });
    wait_for_stage(&orchestrator, JobStage::Retrieving).await;
    let job_id = orchestrator.snapshot().job_id;

    let second = orchestrator.start(harness.request("0", "5")).await;
    assert_eq!(
        second,
        JobOutcome::Rejected {
            current: JobStage::Retrieving
        }
    );
    assert_eq!(orchestrator.snapshot().job_id, job_id);

    assert!(orchestrator.cancel());
    let first = tokio::time::timeout(Duration::from_secs(3), job)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, JobOutcome::Canceled);

    // Once settled, a new job may start from the canceled state
    let tools_calls_before = tools.calls().len();
    let third = orchestrator.start(harness.request("70", "10")).await;
    assert!(matches!(third, JobOutcome::Failed(DomainError::ValidationFailed(_))));
    assert_ne!(orchestrator.snapshot().job_id, job_id);
    assert_eq!(tools.calls().len(), tools_calls_before);
}

#[tokio::test]
async fn test_validation_fails_before_any_process() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Produce,
    ));
    let orchestrator = harness.orchestrator(tools.clone());

    let mut request = harness.request("10", "70");
    request.url = "ftp://example.com/video".to_string();
    let outcome = orchestrator.start(request).await;

    assert!(matches!(outcome, JobOutcome::Failed(DomainError::ValidationFailed(_))));
    assert!(tools.calls().is_empty());
    assert_eq!(
        orchestrator.snapshot().trail,
        vec![JobStage::Idle, JobStage::Failed]
    );
    assert!(harness.temp_root_is_empty());
}

#[tokio::test]
async fn test_missing_tool_fails_fast() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Produce,
    ));
    let settings = OrchestratorSettings {
        trimmer: harness.tools_dir.path().join("not-ffmpeg"),
        ..harness.settings()
    };
    let orchestrator = harness.orchestrator_with(tools.clone(), settings);

    let outcome = orchestrator.start(harness.request("10", "70")).await;

    let JobOutcome::Failed(error) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(matches!(error, DomainError::ToolMissing { .. }));
    assert!(error.is_toolchain_error());
    assert!(tools.calls().is_empty());
    assert!(harness.temp_root_is_empty());
}

#[tokio::test]
async fn test_probe_failure_is_not_fatal() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Fail,
        Retrieval::Produce("mp4"),
        Trim::Produce,
    ));
    let orchestrator = harness.orchestrator(tools);

    let outcome = orchestrator.start(harness.request("10", "70")).await;

    let JobOutcome::Finished(result) = outcome else {
        panic!("expected finished, got {:?}", outcome);
    };
    assert!(result.metadata.is_none());
    assert_eq!(result.output_path, harness.out_dir.path().join("clip.mp4"));

    let snapshot = orchestrator.snapshot();
    assert!(snapshot
        .log
        .entries()
        .any(|e| e.severity == LogSeverity::Warning && e.message.contains("Metadata probe failed")));
}

#[tokio::test]
async fn test_retrieved_extension_may_differ() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("webm"),
        Trim::Produce,
    ));
    let orchestrator = harness.orchestrator(tools.clone());

    let outcome = orchestrator.start(harness.request("10", "70")).await;

    assert!(matches!(outcome, JobOutcome::Finished(_)));
    let trim = tools.call_for("ffmpeg").unwrap();
    assert!(trim.args.iter().any(|a| a.ends_with("source.webm")));
}

#[tokio::test]
async fn test_missing_retrieved_file_fails() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::ProduceNothing,
        Trim::Produce,
    ));
    let orchestrator = harness.orchestrator(tools.clone());

    let outcome = orchestrator.start(harness.request("10", "70")).await;

    assert!(matches!(outcome, JobOutcome::Failed(DomainError::OutputFileMissing(_))));
    assert!(tools.call_for("ffmpeg").is_none());
    assert!(harness.temp_root_is_empty());
}

#[tokio::test]
async fn test_trim_disk_full_is_classified() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Fail {
            code: 1,
            stderr: "av_interleaved_write_frame(): No space left on device",
        },
    ));
    let orchestrator = harness.orchestrator(tools);

    let outcome = orchestrator.start(harness.request("10", "70")).await;

    assert_eq!(outcome, JobOutcome::Failed(DomainError::InsufficientDiskSpace));
    assert_eq!(
        orchestrator.snapshot().trail,
        vec![
            JobStage::Idle,
            JobStage::Retrieving,
            JobStage::Trimming,
            JobStage::Failed
        ]
    );
    assert!(harness.out_dir_is_empty());
}

#[tokio::test]
async fn test_failed_trim_keeps_file_it_did_not_write() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Preempted,
    ));
    let orchestrator = harness.orchestrator(tools);

    let outcome = orchestrator.start(harness.request("10", "70")).await;

    assert!(
        matches!(outcome, JobOutcome::Failed(DomainError::TrimFailed(_))),
        "unexpected {:?}",
        outcome
    );
    assert_eq!(
        std::fs::read(harness.out_dir.path().join("Demo Clip.mp4")).unwrap(),
        b"someone else's clip"
    );
    assert!(harness.temp_root_is_empty());
}

#[tokio::test]
async fn test_section_download_rebases_trim() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Produce,
    ));
    let orchestrator = harness.orchestrator(tools.clone());

    let mut request = harness.request("10", "70");
    request.download_sections = true;
    let outcome = orchestrator.start(request).await;
    assert!(matches!(outcome, JobOutcome::Finished(_)));

    let retrieval = tools.call_for("yt-dlp").unwrap();
    let at = retrieval
        .args
        .iter()
        .position(|a| a == "--download-sections")
        .unwrap();
    assert_eq!(retrieval.args[at + 1], "*5.000-75.000");

    let trim = tools.call_for("ffmpeg").unwrap().args.join(" ");
    assert!(trim.contains("-ss 00:00:05.000"));
    assert!(trim.contains("-to 00:01:05.000"));
    assert!(trim.contains("-c copy"));
}

#[tokio::test]
async fn test_log_is_bounded() {
    let harness = Harness::new();
    let tools = Arc::new(ScriptedTools::new(
        Probe::Metadata,
        Retrieval::Produce("mp4"),
        Trim::Produce,
    ));
    let settings = OrchestratorSettings {
        log_capacity: 3,
        ..harness.settings()
    };
    let orchestrator = harness.orchestrator_with(tools, settings);

    let outcome = orchestrator.start(harness.request("10", "70")).await;
    assert!(matches!(outcome, JobOutcome::Finished(_)));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.log.len(), 3);
    let last = snapshot.log.entries().last().unwrap();
    assert_eq!(last.severity, LogSeverity::Success);
    assert!(last.message.starts_with("Saved"));
}
