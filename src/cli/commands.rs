//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::AppConfig;
use crate::app::{AppContainer, ClipOrchestrator, DefaultAppContainer, JobOutcome};
use crate::cli::args::{ClipArgs, ToolsArgs};
use crate::cli::report::{ConsoleReporter, JobReporter, JsonReporter};
use crate::domain::model::{ClipRequest, JobStage, ToolKind};
use crate::utils::path::locate_executable;

/// Process exit status for a terminal stage
pub fn exit_code(stage: Option<JobStage>) -> u8 {
    match stage {
        Some(JobStage::Finished) => 0,
        Some(JobStage::Canceled) => 130,
        _ => 1,
    }
}

/// Execute the clip command; Ctrl-C cancels the running job
pub async fn clip(args: ClipArgs, mut config: AppConfig) -> Result<JobOutcome> {
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    let container = DefaultAppContainer::new(config);
    let request = args.to_request(container.config());
    let orchestrator = container.orchestrator();

    info!("Starting clip operation");
    info!("URL: {}", request.url);
    info!("Range: {} - {}", request.start, request.end);

    let mut reporter: Box<dyn JobReporter> = if args.json {
        Box::new(JsonReporter::new())
    } else {
        Box::new(ConsoleReporter::new(args.verbose))
    };

    let outcome = drive(orchestrator.clone(), request, reporter.as_mut()).await?;
    reporter.on_outcome(&outcome, &orchestrator.snapshot());
    Ok(outcome)
}

async fn drive(
    orchestrator: Arc<ClipOrchestrator>,
    request: ClipRequest,
    reporter: &mut dyn JobReporter,
) -> Result<JobOutcome> {
    let mut updates = orchestrator.subscribe();
    let mut job = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.start(request).await }
    });

    let mut interrupted = false;
    let mut updates_open = true;
    loop {
        tokio::select! {
            joined = &mut job => {
                return joined.context("Clip job panicked");
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        warn!("Interrupt received, canceling job");
                        orchestrator.cancel();
                    }
                    Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
                }
            }
            changed = updates.changed(), if updates_open => {
                if changed.is_err() {
                    updates_open = false;
                    continue;
                }
                let snapshot = updates.borrow_and_update().clone();
                reporter.on_snapshot(&snapshot);
            }
        }
    }
}

/// Execute the tools command; returns whether both tools are usable
pub fn tools(args: ToolsArgs, config: &AppConfig) -> Result<bool> {
    let checks = [
        (ToolKind::Retrieval, &config.tools.retriever),
        (ToolKind::Trim, &config.tools.trimmer),
    ]
    .map(|(kind, configured)| (kind, configured, locate_executable(kind, configured)));

    let all_ok = checks.iter().all(|(_, _, found)| found.is_ok());

    if args.json {
        let report: Vec<_> = checks
            .iter()
            .map(|(kind, configured, found)| match found {
                Ok(path) => serde_json::json!({
                    "tool": kind,
                    "configured": configured,
                    "path": path,
                    "ok": true,
                }),
                Err(e) => serde_json::json!({
                    "tool": kind,
                    "configured": configured,
                    "ok": false,
                    "error": e.to_string(),
                }),
            })
            .collect();
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize tool report to JSON")?;
        println!("{}", json);
    } else {
        println!("Toolchain");
        println!("=========");
        for (kind, _, found) in &checks {
            match found {
                Ok(path) => println!("✓ {}: {}", kind, path.display()),
                Err(e) => println!("✗ {}", e),
            }
        }
    }

    Ok(all_ok)
}
