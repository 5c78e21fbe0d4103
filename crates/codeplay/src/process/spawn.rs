//! Process spawning and I/O
//!
//! Handles running commands to completion and spawning interactive children.

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tracing::{debug, instrument};

use crate::process::ProcessError;
use crate::process::command::ProgramCommand;
use crate::types::ExitInfo;

/// Captured result of a command run to completion
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit: ExitInfo,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.exit.is_success()
    }

    /// The tool's own diagnostic: stderr when it has content, else stdout
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_owned()
        } else {
            stderr.to_owned()
        }
    }
}

/// Run a command to completion and capture its output (for compilation)
///
/// No time limit is applied.
#[instrument(skip(command), fields(program = command.program()))]
pub async fn run_with_output(command: &ProgramCommand) -> Result<CommandOutput, ProcessError> {
    let output = command
        .build()?
        .output()
        .await
        .map_err(|source| spawn_failed(command, source))?;

    let result = CommandOutput {
        exit: output.status.into(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(exit = ?result.exit, "command finished");
    Ok(result)
}

/// Spawn a command with stdin, stdout and stderr piped
#[instrument(skip(command), fields(program = command.program()))]
pub fn spawn(command: &ProgramCommand) -> Result<RunningProcess, ProcessError> {
    let mut child = command
        .clone()
        .piped_stdin()
        .build()?
        .spawn()
        .map_err(|source| spawn_failed(command, source))?;

    debug!(pid = child.id(), "spawned process");

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    Ok(RunningProcess {
        child,
        stdin,
        stdout,
        stderr,
    })
}

fn spawn_failed(command: &ProgramCommand, source: std::io::Error) -> ProcessError {
    ProcessError::SpawnFailed {
        program: command.program().unwrap_or_default().to_owned(),
        source,
    }
}

/// A spawned child with its pipes split off
///
/// The pipes are public so callers can hand each one to the task that
/// drives it.
#[derive(Debug)]
pub struct RunningProcess {
    pub child: Child,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

impl RunningProcess {
    /// Write to the process stdin
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ProcessError> {
        write_all(self.stdin.as_mut(), data).await
    }

    /// Close stdin to signal EOF
    pub fn close_stdin(&mut self) {
        self.stdin = None;
    }
}

/// Write and flush, treating a closed pipe as broken
pub(crate) async fn write_all(
    stdin: Option<&mut ChildStdin>,
    data: &[u8],
) -> Result<(), ProcessError> {
    let stdin = stdin.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed")
    })?;
    stdin.write_all(data).await?;
    stdin.flush().await?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn run_with_output_captures_streams() {
        let command = ProgramCommand::new(["sh", "-c", "echo out; echo err >&2; exit 3"]);
        let output = run_with_output(&command).await.unwrap();
        assert_eq!(output.exit.exit_code, Some(3));
        assert!(!output.is_success());
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.diagnostic(), "err");
    }

    #[tokio::test]
    async fn diagnostic_falls_back_to_stdout() {
        let command = ProgramCommand::new(["sh", "-c", "echo only-stdout; exit 1"]);
        let output = run_with_output(&command).await.unwrap();
        assert_eq!(output.diagnostic(), "only-stdout");
    }

    #[tokio::test]
    async fn run_with_output_missing_program() {
        let command = ProgramCommand::new(["definitely-not-a-real-tool-4821"]);
        match run_with_output(&command).await {
            Err(ProcessError::SpawnFailed { program, .. }) => {
                assert_eq!(program, "definitely-not-a-real-tool-4821");
            }
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn spawned_process_echoes_stdin() {
        let mut process = spawn(&ProgramCommand::new(["cat"])).unwrap();
        process.write(b"hello\n").await.unwrap();
        process.close_stdin();

        let mut out = String::new();
        process
            .stdout
            .take()
            .unwrap()
            .read_to_string(&mut out)
            .await
            .unwrap();
        assert_eq!(out, "hello\n");

        let status = process.child.wait().await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn write_after_close_is_broken_pipe() {
        let mut process = spawn(&ProgramCommand::new(["cat"])).unwrap();
        process.close_stdin();
        match process.write(b"late\n").await {
            Err(ProcessError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("expected broken pipe, got {other:?}"),
        }
        process.child.wait().await.unwrap();
    }
}
