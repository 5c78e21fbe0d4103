//! Escalated termination
//!
//! Stopping a child is done in two stages: a graceful termination signal to
//! its process group, then a forced kill if it is still alive once the grace
//! period has passed. Batch timeouts, idle timeouts and explicit stops all go
//! through [`terminate`].

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, instrument, warn};

/// Terminate `child` and reap it
///
/// Returns immediately if the child has already exited.
#[instrument(skip(child), fields(pid = child.id()))]
pub async fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    request_exit(child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => {
            debug!("process exited after termination signal");
            status
        }
        Err(_) => {
            warn!(?grace, "process ignored termination signal, killing");
            force_kill(child);
            child.wait().await
        }
    }
}

#[cfg(unix)]
fn request_exit(child: &Child) {
    signal_group(child, nix::sys::signal::Signal::SIGTERM);
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) {
    force_kill(child);
}

fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    signal_group(child, nix::sys::signal::Signal::SIGKILL);

    if let Err(e) = child.start_kill() {
        debug!(?e, "kill after exit");
    }
}

/// Signal the child's process group, falling back to the child alone
#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    let pid = Pid::from_raw(pid);

    if let Err(e) = killpg(pid, signal) {
        debug!(?e, ?signal, "process group signal failed, signalling child");
        if let Err(e) = kill(pid, signal) {
            debug!(?e, ?signal, "signal failed");
        }
    }
}
