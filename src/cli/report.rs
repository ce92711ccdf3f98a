//! Progress reporting for the CLI
//!
//! Reporters are fed every published [`JobSnapshot`] and render only what
//! changed since the previous one.

use std::io::Write;

use crate::app::JobOutcome;
use crate::domain::model::{JobSnapshot, JobStage, LogEntry, LogSeverity};
use crate::utils::Utils;

/// Receives job state changes
pub trait JobReporter: Send {
    fn on_snapshot(&mut self, snapshot: &JobSnapshot);
    fn on_outcome(&mut self, outcome: &JobOutcome, snapshot: &JobSnapshot);
}

/// What a reporter has already shown
#[derive(Default)]
struct Seen {
    stage: Option<JobStage>,
    overall_percent: Option<u32>,
    last_log: Option<LogEntry>,
}

impl Seen {
    /// Entries appended since the last call, oldest first
    fn new_entries<'a>(&mut self, snapshot: &'a JobSnapshot) -> Vec<&'a LogEntry> {
        let entries: Vec<&LogEntry> = snapshot.log.entries().collect();
        let start = self
            .last_log
            .as_ref()
            .and_then(|last| entries.iter().rposition(|e| *e == last))
            .map_or(0, |i| i + 1);
        if let Some(last) = entries.last() {
            self.last_log = Some((*last).clone());
        }
        entries[start..].to_vec()
    }

    fn stage_changed(&mut self, stage: JobStage) -> bool {
        let changed = self.stage != Some(stage);
        self.stage = Some(stage);
        changed
    }

    fn percent_changed(&mut self, overall: f64) -> Option<u32> {
        let percent = (overall.clamp(0.0, 1.0) * 100.0).floor() as u32;
        if self.overall_percent == Some(percent) {
            return None;
        }
        self.overall_percent = Some(percent);
        Some(percent)
    }
}

/// Progress bar on stderr, summary on stdout
pub struct ConsoleReporter {
    verbose: bool,
    seen: Seen,
    bar_visible: bool,
}

impl ConsoleReporter {
    const BAR_LENGTH: usize = 30;

    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            seen: Seen::default(),
            bar_visible: false,
        }
    }

    fn end_bar(&mut self) {
        if self.bar_visible {
            eprintln!();
            self.bar_visible = false;
        }
    }

    fn draw_bar(&mut self, stage: JobStage, percent: u32) {
        let filled = (percent as usize * Self::BAR_LENGTH / 100).min(Self::BAR_LENGTH);
        let bar = "#".repeat(filled) + &"-".repeat(Self::BAR_LENGTH - filled);
        eprint!("\r[{}] {:>3}% {:<10}", bar, percent, stage);
        let _ = std::io::stderr().flush();
        self.bar_visible = true;
    }
}

impl JobReporter for ConsoleReporter {
    fn on_snapshot(&mut self, snapshot: &JobSnapshot) {
        for entry in self.seen.new_entries(snapshot) {
            let shown = match entry.severity {
                LogSeverity::Debug => false,
                LogSeverity::Info => self.verbose,
                _ => true,
            };
            if shown {
                self.end_bar();
                eprintln!("{:>7}: {}", severity_label(entry.severity), entry.message);
            }
        }

        let stage_changed = self.seen.stage_changed(snapshot.stage);
        if !snapshot.stage.is_running() {
            return;
        }
        if stage_changed {
            self.end_bar();
        }
        if let Some(percent) = self.seen.percent_changed(snapshot.overall_progress) {
            self.draw_bar(snapshot.stage, percent);
        }
    }

    fn on_outcome(&mut self, outcome: &JobOutcome, snapshot: &JobSnapshot) {
        self.on_snapshot(snapshot);
        self.end_bar();
        match outcome {
            JobOutcome::Finished(result) => {
                println!("✓ Saved {}", result.output_path.display());
                println!(
                    "  {} | retrieval {:.1}s | trim {:.1}s",
                    Utils::format_file_size(result.size_bytes),
                    result.retrieval_secs,
                    result.trim_secs
                );
            }
            JobOutcome::Failed(error) => {
                println!("✗ Failed ({:?}): {}", error.severity(), error);
            }
            JobOutcome::Canceled => println!("Canceled"),
            JobOutcome::Rejected { current } => {
                println!("✗ Another job is still {}", current);
            }
        }
    }
}

fn severity_label(severity: LogSeverity) -> &'static str {
    match severity {
        LogSeverity::Debug => "debug",
        LogSeverity::Info => "info",
        LogSeverity::Success => "ok",
        LogSeverity::Warning => "warning",
        LogSeverity::Error => "error",
    }
}

/// One JSON object per line on stdout
pub struct JsonReporter {
    seen: Seen,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self {
            seen: Seen::default(),
        }
    }

    fn emit(event: serde_json::Value) {
        println!("{}", event);
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JobReporter for JsonReporter {
    fn on_snapshot(&mut self, snapshot: &JobSnapshot) {
        for entry in self.seen.new_entries(snapshot) {
            Self::emit(serde_json::json!({
                "event": "log",
                "severity": entry.severity,
                "message": entry.message,
                "timestamp": entry.timestamp.to_rfc3339(),
            }));
        }

        if self.seen.stage_changed(snapshot.stage) {
            Self::emit(serde_json::json!({
                "event": "stage",
                "job_id": snapshot.job_id,
                "stage": snapshot.stage,
            }));
        }
        if snapshot.stage.is_running() {
            if let Some(percent) = self.seen.percent_changed(snapshot.overall_progress) {
                Self::emit(serde_json::json!({
                    "event": "progress",
                    "stage": snapshot.stage,
                    "stage_progress": snapshot.stage_progress,
                    "overall_progress": snapshot.overall_progress,
                    "percent": percent,
                }));
            }
        }
    }

    fn on_outcome(&mut self, outcome: &JobOutcome, snapshot: &JobSnapshot) {
        self.on_snapshot(snapshot);
        let event = match outcome {
            JobOutcome::Finished(result) => serde_json::json!({
                "event": "finished",
                "result": result,
            }),
            JobOutcome::Failed(error) => serde_json::json!({
                "event": "failed",
                "error": error,
                "message": error.to_string(),
                "severity": error.severity(),
            }),
            JobOutcome::Canceled => serde_json::json!({ "event": "canceled" }),
            JobOutcome::Rejected { current } => serde_json::json!({
                "event": "rejected",
                "stage": current,
            }),
        };
        Self::emit(event);
    }
}
