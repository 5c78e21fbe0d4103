//! Command builder for child processes

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::process::ProcessError;

/// Builder for a child process invocation
#[derive(Debug, Clone, Default)]
pub struct ProgramCommand {
    /// Program followed by its arguments
    argv: Vec<String>,
    env: HashMap<String, String>,
    working_dir: Option<PathBuf>,
    /// Pipe stdin instead of attaching /dev/null
    stdin: bool,
}

impl ProgramCommand {
    /// Create a builder from an expanded command template
    pub fn new(argv: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Pipe stdin so input can be written later
    pub fn piped_stdin(mut self) -> Self {
        self.stdin = true;
        self
    }

    /// Program name (first element of argv)
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments after the program
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Build the tokio command.
    ///
    /// stdout and stderr are always piped. The child is killed if its handle
    /// is dropped, and on unix it leads a process group of its own so that
    /// termination signals reach anything it spawns (`go run`, shells).
    pub fn build(&self) -> Result<Command, ProcessError> {
        let (program, args) = self.argv.split_first().ok_or(ProcessError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&self.env)
            .stdin(if self.stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        command.process_group(0);

        Ok(command)
    }
}
