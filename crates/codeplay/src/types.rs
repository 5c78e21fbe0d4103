use std::fmt;

use serde::{Deserialize, Serialize};

/// Output reported for a failed run that produced no output at all
pub const EXECUTION_FAILED: &str = "Execution failed";

/// Request for a one-shot batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Language ID (e.g., "python")
    pub language: String,

    /// Source code
    pub code: String,

    /// Lines fed to stdin, in order
    #[serde(default)]
    pub inputs: Vec<String>,
}

/// Request for starting an interactive session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Language ID (e.g., "javascript")
    pub language: String,

    /// Source code
    pub code: String,
}

/// Final result of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Whether the program compiled, started and exited with code 0
    pub success: bool,

    /// Diagnostic or program output, trimmed
    pub output: String,
}

impl RunResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }

    /// Build a result from captured streams.
    ///
    /// Reports trimmed stderr when it has content, else trimmed stdout,
    /// whatever the exit status. A run with no output at all reports
    /// [`EXECUTION_FAILED`].
    pub fn from_streams(success: bool, stdout: &str, stderr: &str) -> Self {
        let output = match (stderr.trim(), stdout.trim()) {
            ("", "") => EXECUTION_FAILED,
            ("", stdout) => stdout,
            (stderr, _) => stderr,
        };

        Self {
            success,
            output: output.to_owned(),
        }
    }
}

/// Unique identifier of an interactive session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh ID (random UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which output stream a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// How a process ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitInfo {
    /// Exit code if the program exited normally
    pub exit_code: Option<i32>,

    /// Signal number if the program was killed by a signal
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitInfo {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            exit_code: status.code(),
            signal,
        }
    }
}

/// Event pushed from a live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A chunk of program output
    #[serde(rename_all = "camelCase")]
    Output {
        session_id: SessionId,
        stream_kind: StreamKind,
        data: String,
    },

    /// The program ended; always the last event of a session
    #[serde(rename_all = "camelCase")]
    Exit {
        session_id: SessionId,
        #[serde(flatten)]
        exit: ExitInfo,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            SessionEvent::Output { session_id, .. } | SessionEvent::Exit { session_id, .. } => {
                session_id
            }
        }
    }
}

/// Response to a session start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum StartResponse {
    #[serde(rename_all = "camelCase")]
    Started { session_id: SessionId },
    Failed { error: String },
}

/// Response to an input write or a stop request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}
