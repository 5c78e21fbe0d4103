//! Interactive sessions
//!
//! A session is a run process that stays alive while the caller sends input
//! and receives output events. Live sessions are registered in a
//! [`SessionTable`]; an entry exists exactly from successful spawn until its
//! supervisor tears it down.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::process::ChildStdin;
use tokio::sync::{Mutex, Notify, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::process::{RunningProcess, spawn};
use crate::runner::prepare::{Prepared, prepare};
use crate::runner::stream::pump;
use crate::runner::supervisor::{ActivityHandle, IdleTimer, Supervisor};
use crate::runner::{RunError, SessionError};
use crate::types::{SessionEvent, SessionId, StartRequest, StreamKind};
use crate::workspace::Workspace;

/// Shared table of live sessions
pub(crate) type SessionTable = Arc<RwLock<HashMap<SessionId, SessionEntry>>>;

/// Write side of a session's stdin; `None` once closed
pub(crate) type SharedStdin = Arc<Mutex<Option<ChildStdin>>>;

/// What callers can reach of a live session
#[derive(Debug)]
pub(crate) struct SessionEntry {
    stdin: SharedStdin,
    activity: ActivityHandle,
    stop: Arc<Notify>,
}

/// Stream of output and exit events from all sessions of a manager
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl EventStream {
    /// Receive the next event
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Receive an event if one is already queued
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

/// Starts, drives and stops interactive sessions
#[derive(Debug, Clone)]
pub struct SessionManager {
    config: Arc<Config>,
    workspace: Workspace,
    table: SessionTable,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionManager {
    /// Create a manager and the event stream its sessions report to
    pub fn new(config: Arc<Config>, workspace: Workspace) -> (Self, EventStream) {
        let (events, rx) = mpsc::unbounded_channel();
        let manager = Self {
            config,
            workspace,
            table: Arc::new(RwLock::new(HashMap::new())),
            events,
        };
        (manager, EventStream { rx })
    }

    /// Compile if needed, spawn the program and register the session
    #[instrument(skip(self, request), fields(language = %request.language))]
    pub async fn start(&self, request: &StartRequest) -> Result<SessionId, SessionError> {
        let Prepared {
            mut artifacts,
            run_command,
            ..
        } = prepare(&self.config, &self.workspace, &request.language, &request.code).await?;

        let process = match spawn(&run_command) {
            Ok(process) => process,
            Err(e) => {
                artifacts.cleanup().await;
                return Err(RunError::from(e).into());
            }
        };
        let RunningProcess {
            child,
            stdin,
            stdout,
            stderr,
        } = process;

        let id = SessionId::generate();
        let stdin: SharedStdin = Arc::new(Mutex::new(stdin));
        let (idle, activity) = IdleTimer::new(self.config.timeouts.idle());
        let stop = Arc::new(Notify::new());

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            readers.push(self.relay(stdout, &id, StreamKind::Stdout, &activity));
        }
        if let Some(stderr) = stderr {
            readers.push(self.relay(stderr, &id, StreamKind::Stderr, &activity));
        }

        self.table.write().await.insert(
            id.clone(),
            SessionEntry {
                stdin: stdin.clone(),
                activity,
                stop: stop.clone(),
            },
        );

        let supervisor = Supervisor {
            id: id.clone(),
            child,
            idle,
            stop,
            grace: self.config.timeouts.kill_grace(),
            stdin,
            readers,
            artifacts,
            table: self.table.clone(),
            events: self.events.clone(),
        };
        tokio::spawn(supervisor.run());

        info!(session = %id, "session started");
        Ok(id)
    }

    /// Forward one stream of the process as output events
    fn relay<R>(
        &self,
        reader: R,
        id: &SessionId,
        stream: StreamKind,
        activity: &ActivityHandle,
    ) -> JoinHandle<()>
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let id = id.clone();
        let events = self.events.clone();
        let activity = activity.clone();

        tokio::spawn(async move {
            pump(reader, |data| {
                activity.touch();
                let _ = events.send(SessionEvent::Output {
                    session_id: id.clone(),
                    stream_kind: stream,
                    data,
                });
            })
            .await;
            debug!(session = %id, %stream, "output stream closed");
        })
    }

    /// Write `text` followed by a newline to the session's stdin
    ///
    /// A write that races the process exit fails with
    /// [`SessionError::StreamUnwritable`] rather than being dropped.
    #[instrument(skip(self, text), fields(session = %id, len = text.len()))]
    pub async fn send_input(&self, id: &SessionId, text: &str) -> Result<(), SessionError> {
        let (stdin, activity) = {
            let table = self.table.read().await;
            let entry = table
                .get(id)
                .ok_or_else(|| SessionError::NotFound(id.clone()))?;
            (entry.stdin.clone(), entry.activity.clone())
        };

        let mut data = Vec::with_capacity(text.len() + 1);
        data.extend_from_slice(text.as_bytes());
        data.push(b'\n');

        let mut guard = stdin.lock().await;
        if let Err(e) = crate::process::write_stdin(guard.as_mut(), &data).await {
            warn!(%e, "input stream not writable");
            guard.take();
            return Err(SessionError::StreamUnwritable(id.clone()));
        }
        drop(guard);

        activity.touch();
        Ok(())
    }

    /// Request escalated termination of a live session
    ///
    /// Teardown happens when the process actually exits; stopping an
    /// already-stopping session is harmless.
    #[instrument(skip(self), fields(session = %id))]
    pub async fn stop(&self, id: &SessionId) -> Result<(), SessionError> {
        let table = self.table.read().await;
        let entry = table
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        entry.stop.notify_one();
        debug!("stop signalled");
        Ok(())
    }

    /// IDs of all live sessions, sorted
    pub async fn active_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.table.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Request termination of every live session
    pub async fn stop_all(&self) {
        for entry in self.table.read().await.values() {
            entry.stop.notify_one();
        }
    }
}
