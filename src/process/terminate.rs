use crate::error::{BabysitError, Result};
use crate::process::types::Termination;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, info, warn};

/// Stop a child: SIGINT first, SIGKILL if it is still alive after `grace`.
///
/// Calling this on a child that already exited is a no-op.
pub async fn terminate_gracefully(child: &mut Child, grace: Duration) -> Result<Termination> {
    if child.try_wait()?.is_some() {
        debug!("Child already exited, nothing to terminate");
        return Ok(Termination::AlreadyExited);
    }

    let Some(pid) = child.id() else {
        return Ok(Termination::AlreadyExited);
    };
    let nix_pid = Pid::from_raw(pid as i32);

    info!(pid, "Sending SIGINT to child");
    match signal::kill(nix_pid, Signal::SIGINT) {
        Ok(()) => {}
        Err(Errno::ESRCH) => {
            child.wait().await?;
            return Ok(Termination::AlreadyExited);
        }
        Err(e) => {
            return Err(BabysitError::SignalError(format!(
                "Failed to send SIGINT to {}: {}",
                pid, e
            )))
        }
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            info!(pid, %status, "Child exited after SIGINT");
            Ok(Termination::Interrupted)
        }
        Ok(Err(e)) => Err(BabysitError::Io(e)),
        Err(_) => {
            warn!(pid, ?grace, "Child did not exit within grace period, sending SIGKILL");
            // kill() sends SIGKILL and reaps the child
            child.kill().await?;
            Ok(Termination::Killed)
        }
    }
}
