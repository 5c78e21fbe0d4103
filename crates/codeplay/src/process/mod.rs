//! Child process plumbing
//!
//! This module builds commands from expanded language templates, runs
//! compilers to completion, spawns long-lived programs with piped stdio and
//! terminates them in two stages.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use crate::process::command::ProgramCommand;
pub use crate::process::spawn::{CommandOutput, RunningProcess, run_with_output, spawn};
pub(crate) use crate::process::spawn::write_all as write_stdin;
pub use crate::process::terminate::terminate;

mod command;
mod spawn;
mod terminate;

/// Errors that occur while starting or driving a child process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to start '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve a program name to an executable path using the host's PATH.
///
/// Names containing a `/` are checked as given. Returns `None` when nothing
/// executable is found.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        let path = Path::new(program);
        return is_executable(path).then(|| path.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| {
            let candidate = dir.join(program);
            let with_suffix = dir.join(format!("{program}{}", std::env::consts::EXE_SUFFIX));
            [candidate, with_suffix]
        })
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
