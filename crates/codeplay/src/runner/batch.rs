//! Batch execution
//!
//! Runs a program to completion with scripted input and folds everything
//! that can happen (unsupported language, compile error, spawn failure,
//! timeout) into a single [`RunResult`].

use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::process::ChildStdin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, Timeouts};
use crate::process::{ProgramCommand, RunningProcess, spawn, terminate};
use crate::runner::prepare::{Prepared, prepare};
use crate::runner::stream::pump;
use crate::types::{BatchRequest, RunResult};
use crate::workspace::Workspace;

/// Compile (if needed) and run `request`, feeding it the scripted inputs
///
/// Never fails; every problem becomes a failed [`RunResult`]. The run's
/// artifacts are gone by the time this returns.
#[instrument(skip_all, fields(language = %request.language, inputs = request.inputs.len()))]
pub async fn run_batch(config: &Config, workspace: &Workspace, request: &BatchRequest) -> RunResult {
    let Prepared {
        mut artifacts,
        run_command,
        ..
    } = match prepare(config, workspace, &request.language, &request.code).await {
        Ok(prepared) => prepared,
        Err(e) => {
            debug!(%e, "run not started");
            return RunResult::failure(e.to_string());
        }
    };

    let result = execute(&config.timeouts, &run_command, &request.inputs).await;
    let removed = artifacts.cleanup().await;

    debug!(success = result.success, removed, "batch run complete");
    result
}

/// Spawn the prepared program and drive it to exit or timeout
async fn execute(timeouts: &Timeouts, command: &ProgramCommand, inputs: &[String]) -> RunResult {
    let RunningProcess {
        mut child,
        stdin,
        stdout,
        stderr,
    } = match spawn(command) {
        Ok(process) => process,
        Err(e) => return RunResult::failure(format!("Failed to start process: {e}")),
    };

    let feeder = tokio::spawn(feed(stdin, inputs.to_vec(), timeouts.input_delay()));
    let mut stdout = Capture::start(stdout);
    let mut stderr = Capture::start(stderr);

    let success = match tokio::time::timeout(timeouts.batch(), child.wait()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            warn!(?e, "failed to wait for process");
            false
        }
        Err(_) => {
            info!(limit = ?timeouts.batch(), "batch run timed out, terminating");
            if let Err(e) = terminate(&mut child, timeouts.kill_grace()).await {
                warn!(?e, "failed to terminate timed out process");
            }
            false
        }
    };
    feeder.abort();

    let stdout = stdout.finish(timeouts.kill_grace()).await;
    let stderr = stderr.finish(timeouts.kill_grace()).await;

    RunResult::from_streams(success, &stdout, &stderr)
}

/// Write each input line, pacing them by `delay`, then close stdin
async fn feed(stdin: Option<ChildStdin>, inputs: Vec<String>, delay: Duration) {
    let Some(mut stdin) = stdin else {
        return;
    };

    for (i, line) in inputs.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');

        if let Err(e) = crate::process::write_stdin(Some(&mut stdin), &data).await {
            debug!(%e, index = i, "program stopped reading input");
            return;
        }
    }

    if !inputs.is_empty() {
        tokio::time::sleep(delay).await;
    }
    drop(stdin);
}

/// Accumulates one output stream in the background
struct Capture {
    task: Option<JoinHandle<()>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Capture {
    fn start<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = reader.map(|reader| {
            tokio::spawn(async move {
                pump(reader, |chunk| {
                    let _ = tx.send(chunk);
                })
                .await;
            })
        });
        Self { task, rx }
    }

    /// Everything captured so far, once the stream closes or `grace` runs out
    ///
    /// A grandchild holding the pipe open must not keep the run alive.
    async fn finish(&mut self, grace: Duration) -> String {
        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(grace, task).await.is_err() {
                debug!("output still open after exit, detaching reader");
                abort.abort();
            }
        }

        let mut text = String::new();
        while let Ok(chunk) = self.rx.try_recv() {
            text.push_str(&chunk);
        }
        text
    }
}
