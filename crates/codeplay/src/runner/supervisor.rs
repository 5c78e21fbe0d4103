//! Session supervision
//!
//! Each live session is owned by one [`Supervisor`] task. It waits for the
//! first of three things: the process exiting on its own, the idle timer
//! expiring, or an explicit stop. The latter two go through escalated
//! termination. Whatever happened, the task then runs teardown exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::process::terminate;
use crate::runner::session::{SessionTable, SharedStdin};
use crate::types::{ExitInfo, SessionEvent, SessionId};
use crate::workspace::Artifacts;

/// Records activity on a session, postponing its idle timeout
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    tx: Arc<watch::Sender<Instant>>,
}

impl ActivityHandle {
    /// Mark the session as active now
    pub fn touch(&self) {
        self.tx.send_replace(Instant::now());
    }
}

/// Idle timer restarted by every [`ActivityHandle::touch`]
#[derive(Debug)]
pub struct IdleTimer {
    rx: watch::Receiver<Instant>,
    window: Duration,
}

impl IdleTimer {
    /// Create a timer whose window starts now
    pub fn new(window: Duration) -> (Self, ActivityHandle) {
        let (tx, rx) = watch::channel(Instant::now());
        (
            Self { rx, window },
            ActivityHandle { tx: Arc::new(tx) },
        )
    }

    /// Resolve once no activity has been recorded for a full window
    pub async fn expired(&mut self) {
        loop {
            let deadline = *self.rx.borrow_and_update() + self.window;

            tokio::select! {
                () = tokio::time::sleep_until(deadline) => {
                    if *self.rx.borrow() + self.window <= Instant::now() {
                        return;
                    }
                }
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        // no handle left to record activity
                        tokio::time::sleep_until(deadline).await;
                        return;
                    }
                }
            }
        }
    }
}

/// Why a session's process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    Exited,
    IdleTimeout,
    Stopped,
}

/// Owner of one session's process and artifacts
pub(crate) struct Supervisor {
    pub id: SessionId,
    pub child: Child,
    pub idle: IdleTimer,
    pub stop: Arc<Notify>,
    pub grace: Duration,
    pub stdin: SharedStdin,
    pub readers: Vec<JoinHandle<()>>,
    pub artifacts: Artifacts,
    pub table: SessionTable,
    pub events: mpsc::UnboundedSender<SessionEvent>,
}

impl Supervisor {
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn run(mut self) {
        let (reason, status) = tokio::select! {
            status = self.child.wait() => (Shutdown::Exited, status),
            () = self.idle.expired() => {
                info!(window = ?self.idle.window, "session idle, terminating");
                (Shutdown::IdleTimeout, terminate(&mut self.child, self.grace).await)
            }
            () = self.stop.notified() => {
                info!("stop requested, terminating");
                (Shutdown::Stopped, terminate(&mut self.child, self.grace).await)
            }
        };

        let exit = match status {
            Ok(status) => ExitInfo::from(status),
            Err(e) => {
                warn!(?e, "failed to reap session process");
                ExitInfo::default()
            }
        };

        self.teardown(reason, exit).await;
    }

    /// Release everything the session holds, then announce its exit.
    ///
    /// The table entry is gone before the exit event is sent, so anyone who
    /// has seen the event gets "no such session" from then on.
    async fn teardown(mut self, reason: Shutdown, exit: ExitInfo) {
        self.stdin.lock().await.take();
        self.table.write().await.remove(&self.id);

        for reader in std::mem::take(&mut self.readers) {
            let abort = reader.abort_handle();
            if tokio::time::timeout(self.grace, reader).await.is_err() {
                debug!("output still open after exit, detaching reader");
                abort.abort();
            }
        }

        self.artifacts.cleanup().await;

        info!(?reason, exit_code = exit.exit_code, signal = exit.signal, "session ended");
        let _ = self.events.send(SessionEvent::Exit {
            session_id: self.id.clone(),
            exit,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(120);

    /// Paused time jumps straight to timer deadlines, give or take a tick
    fn assert_elapsed(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(2),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_window_without_activity() {
        let (mut timer, _activity) = IdleTimer::new(WINDOW);
        let started = Instant::now();

        timer.expired().await;

        assert_elapsed(started, WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_expire_early() {
        let (mut timer, _activity) = IdleTimer::new(WINDOW);

        let early = tokio::time::timeout(WINDOW - Duration::from_millis(1), timer.expired()).await;
        assert!(early.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn activity_postpones_by_full_window() {
        let (mut timer, activity) = IdleTimer::new(WINDOW);
        let started = Instant::now();

        let almost = WINDOW - Duration::from_secs(1);
        assert!(tokio::time::timeout(almost, timer.expired()).await.is_err());
        activity.touch();

        // the first deadline passes without expiry
        assert!(tokio::time::timeout(almost, timer.expired()).await.is_err());

        timer.expired().await;
        assert_elapsed(started, almost + WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn touch_from_another_task() {
        let (mut timer, activity) = IdleTimer::new(WINDOW);
        let started = Instant::now();

        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_secs(100)).await;
                activity.touch();
            }
            // handle dropped here; the last window still runs out
        });

        timer.expired().await;
        assert_elapsed(started, Duration::from_secs(300) + WINDOW);
    }
}
