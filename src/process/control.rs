use crate::error::{BabysitError, Result};
use crate::process::types::ControlSignal;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Sending half of the supervisor's control channel.
///
/// Both the OS signal listener and the redeploy trigger deliver their
/// requests through this handle.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlSignal>,
}

/// Receiving half, owned by the supervisor
pub type ControlReceiver = mpsc::UnboundedReceiver<ControlSignal>;

/// Create a new control channel
pub fn control_channel() -> (ControlHandle, ControlReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ControlHandle { tx }, rx)
}

impl ControlHandle {
    pub fn send(&self, signal: ControlSignal) -> Result<()> {
        self.tx.send(signal).map_err(|_| {
            BabysitError::SignalError(format!("Supervisor is gone, dropped {} request", signal))
        })
    }

    /// Ask the supervisor to gracefully restart the child
    pub fn request_restart(&self) -> Result<()> {
        self.send(ControlSignal::Restart)
    }

    /// Ask the supervisor to stop the child and exit
    pub fn request_shutdown(&self) -> Result<()> {
        self.send(ControlSignal::Terminate)
    }
}

/// Register SIGINT, SIGTERM and SIGUSR1 for the lifetime of the process and
/// forward every delivery to the control channel
pub fn spawn_signal_listener(handle: ControlHandle) -> Result<JoinHandle<()>> {
    let register = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| {
            BabysitError::SignalError(format!("Failed to setup {} handler: {}", name, e))
        })
    };

    let mut sigint = register(SignalKind::interrupt(), "SIGINT")?;
    let mut sigterm = register(SignalKind::terminate(), "SIGTERM")?;
    let mut sigusr1 = register(SignalKind::user_defined1(), "SIGUSR1")?;

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = sigint.recv() => ControlSignal::Interrupt,
                Some(()) = sigterm.recv() => ControlSignal::Terminate,
                Some(()) = sigusr1.recv() => ControlSignal::Restart,
                else => break,
            };

            info!(signal = %received, "Received control signal");

            if handle.send(received).is_err() {
                debug!("Control channel closed, stopping signal listener");
                break;
            }
        }
    }))
}
