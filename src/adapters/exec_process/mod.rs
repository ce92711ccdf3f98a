//! Process supervisor adapter
//!
//! Runs one external tool at a time on tokio, streams stdout and stderr as
//! lines through two reader tasks, and on cancellation escalates from a
//! graceful termination signal to a forced kill after a grace period.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ClipError, ClipResult};
use crate::ports::*;

/// Default wait between the termination signal and the forced kill
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// How long to keep draining output after the process has exited
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Tokio-based process supervisor
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    grace_period: Duration,
}

impl ProcessSupervisor {
    /// Create new supervisor with the default grace period
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    fn build_command(spec: &ProcessSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        // Own process group, so signals reach helpers the tool spawns
        #[cfg(unix)]
        command.process_group(0);
        command
    }

    /// Graceful signal, then forced kill once the grace period lapses.
    /// Where no graceful signal exists the kill is immediate.
    async fn terminate_then_kill(&self, child: &mut Child) {
        let pid = child.id();
        if !send_terminate(pid) {
            Self::kill(child, pid).await;
            return;
        }

        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(_) => debug!(?pid, "Process exited after termination signal"),
            Err(_) => {
                warn!(
                    ?pid,
                    grace_ms = self.grace_period.as_millis() as u64,
                    "Process ignored termination signal, killing"
                );
                Self::kill(child, pid).await;
            }
        }
    }

    async fn kill(child: &mut Child, pid: Option<u32>) {
        send_kill(pid);
        if let Err(e) = child.kill().await {
            warn!(?pid, "Failed to kill process: {}", e);
        }
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessPort for ProcessSupervisor {
    async fn run(
        &self,
        spec: &ProcessSpec,
        cancel: &CancellationToken,
        on_line: &mut (dyn FnMut(OutputLine) + Send),
    ) -> ClipResult<ProcessOutcome> {
        if cancel.is_cancelled() {
            return Ok(ProcessOutcome::Cancelled);
        }

        let program = spec.program.display().to_string();
        let mut child = Self::build_command(spec)
            .spawn()
            .map_err(|source| ClipError::Launch {
                program: program.clone(),
                source,
            })?;
        debug!(program = %program, pid = ?child.id(), args = ?spec.args, "Process started");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, OutputStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        let mut streams_open = true;
        let status = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break None,
                line = rx.recv(), if streams_open => match line {
                    Some(line) => on_line(line),
                    None => streams_open = false,
                },
                status = child.wait() => break Some(status),
            }
        };

        let outcome = match status {
            None => {
                self.terminate_then_kill(&mut child).await;
                ProcessOutcome::Cancelled
            }
            Some(status) => {
                let status = status
                    .map_err(|e| ClipError::io(format!("Failed to wait for {}", program), e))?;
                // Exited; deliver whatever is still buffered in the pipes
                let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
                    while let Some(line) = rx.recv().await {
                        on_line(line);
                    }
                })
                .await;
                if drained.is_err() {
                    debug!(program = %program, "Output still open after exit, detaching readers");
                }

                if cancel.is_cancelled() {
                    ProcessOutcome::Cancelled
                } else {
                    ProcessOutcome::Exited(status.code().unwrap_or(-1))
                }
            }
        };

        for reader in readers {
            reader.abort();
        }
        debug!(program = %program, ?outcome, "Process finished");
        Ok(outcome)
    }
}

fn spawn_reader<R>(
    stream: R,
    kind: OutputStream,
    tx: mpsc::UnboundedSender<OutputLine>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = BufReader::new(stream).split(b'\n');
        loop {
            match segments.next_segment().await {
                Ok(Some(bytes)) => {
                    let text = String::from_utf8_lossy(&bytes)
                        .trim_end_matches('\r')
                        .to_string();
                    if tx.send(OutputLine { stream: kind, text }).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(stream = ?kind, "Output read error: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
            debug!(pid, ?signal, "Signal delivery failed: {}", e);
        }
    }
}

/// Returns whether a graceful signal was sent
#[cfg(unix)]
fn send_terminate(pid: Option<u32>) -> bool {
    signal_group(pid, nix::sys::signal::Signal::SIGTERM);
    true
}

#[cfg(unix)]
fn send_kill(pid: Option<u32>) {
    signal_group(pid, nix::sys::signal::Signal::SIGKILL);
}

// Windows has no graceful signal for console tools; the kill does the work
#[cfg(not(unix))]
fn send_terminate(_pid: Option<u32>) -> bool {
    false
}

#[cfg(not(unix))]
fn send_kill(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graceful_signal_only_on_unix() {
        assert_eq!(send_terminate(None), cfg!(unix));
    }

    #[cfg(windows)]
    #[tokio::test]
    async fn test_cancel_does_not_wait_out_grace_period() {
        let supervisor = ProcessSupervisor::with_grace_period(Duration::from_secs(10));
        let spec = ProcessSpec::new("cmd").args(["/C", "ping -n 30 127.0.0.1 >NUL"]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let outcome = supervisor
            .run(&spec, &cancel, &mut |_: OutputLine| {})
            .await
            .unwrap();

        assert_eq!(outcome, ProcessOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
