//! Code runner for codeplay
//!
//! Provides the high-level API: one-shot batch runs and interactive sessions
//! whose output arrives on an [`EventStream`].

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

pub use crate::runner::batch::run_batch;
pub use crate::runner::prepare::{COMPILATION_FAILED, Prepared, prepare};
pub use crate::runner::session::{EventStream, SessionManager};
pub use crate::runner::supervisor::{ActivityHandle, IdleTimer};

mod batch;
mod prepare;
mod session;
mod stream;
mod supervisor;

use crate::config::{Config, ConfigError};
use crate::process::{ProcessError, resolve_program};
use crate::types::{AckResponse, BatchRequest, RunResult, SessionId, StartRequest, StartResponse};
use crate::workspace::Workspace;

/// Errors that stop a program from being started
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    UnsupportedLanguage(#[from] ConfigError),

    #[error("{0}")]
    NoEntrySymbol(&'static str),

    #[error("{0}")]
    CompileFailed(String),

    #[error("Failed to start process: {0}")]
    Spawn(#[from] ProcessError),

    #[error("workspace error: {0}")]
    Workspace(#[source] std::io::Error),
}

/// Errors that occur during interactive sessions
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active session with id {0}")]
    NotFound(SessionId),

    #[error("Input stream of session {0} is not writable")]
    StreamUnwritable(SessionId),

    #[error(transparent)]
    Start(#[from] RunError),
}

/// High-level runner for code execution
///
/// Cheap to clone; clones share the session table and the event stream.
#[derive(Debug, Clone)]
pub struct Runner {
    config: Arc<Config>,
    workspace: Workspace,
    sessions: SessionManager,
}

impl Runner {
    /// Create a runner with the given configuration
    ///
    /// Events of every session started through this runner (or its clones)
    /// arrive on the returned stream.
    pub fn new(config: Config) -> (Self, EventStream) {
        let config = Arc::new(config);
        let workspace = Workspace::new(config.scratch_dir());
        let (sessions, events) = SessionManager::new(config.clone(), workspace.clone());

        let runner = Self {
            config,
            workspace,
            sessions,
        };
        (runner, events)
    }

    /// Create a runner with the embedded default languages
    pub fn with_defaults() -> (Self, EventStream) {
        Self::new(Config::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the scratch workspace
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Whether every program `language_id` needs is installed
    ///
    /// Unknown languages report `false`.
    pub fn check_language(&self, language_id: &str) -> bool {
        self.config
            .get_language(language_id)
            .map(|language| {
                language
                    .required_programs()
                    .into_iter()
                    .all(|program| resolve_program(program).is_some())
            })
            .unwrap_or(false)
    }

    /// Availability of every configured language
    pub fn check_all_languages(&self) -> BTreeMap<String, bool> {
        self.config
            .supported_languages()
            .into_iter()
            .map(|id| {
                let available = self.check_language(&id);
                (id, available)
            })
            .collect()
    }

    /// Compile (if needed) and run code with scripted input lines
    pub async fn run_code_with_input(&self, request: &BatchRequest) -> RunResult {
        run_batch(&self.config, &self.workspace, request).await
    }

    /// Start an interactive session
    pub async fn start_run(&self, request: &StartRequest) -> StartResponse {
        match self.sessions.start(request).await {
            Ok(session_id) => StartResponse::Started { session_id },
            Err(e) => StartResponse::Failed {
                error: e.to_string(),
            },
        }
    }

    /// Send one line of input to a session
    pub async fn send_input(&self, session_id: &SessionId, text: &str) -> AckResponse {
        match self.sessions.send_input(session_id, text).await {
            Ok(()) => AckResponse::ok(),
            Err(e) => AckResponse::error(e.to_string()),
        }
    }

    /// Stop a session
    ///
    /// Answers `{ok: true}` once termination has been requested; the exit
    /// event follows. An id that is unknown or already ended answers
    /// `{ok: false}` with a "No active session" error and changes nothing,
    /// so callers may treat it as "already stopped".
    pub async fn stop_run(&self, session_id: &SessionId) -> AckResponse {
        match self.sessions.stop(session_id).await {
            Ok(()) => AckResponse::ok(),
            Err(e) => AckResponse::error(e.to_string()),
        }
    }

    /// IDs of all live sessions
    pub async fn active_sessions(&self) -> Vec<SessionId> {
        self.sessions.active_sessions().await
    }

    /// Request termination of every live session
    ///
    /// Each session still reports its own exit event.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let live = self.sessions.active_sessions().await.len();
        info!(live, "stopping all sessions");
        self.sessions.stop_all().await;
    }

    /// Session manager backing this runner
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}
