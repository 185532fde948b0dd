use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::process::Child;

/// Control requests delivered to the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// SIGINT: shut everything down
    Interrupt,
    /// SIGTERM: shut everything down
    Terminate,
    /// SIGUSR1 or a successful redeploy: restart the child
    Restart,
}

impl ControlSignal {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, ControlSignal::Interrupt | ControlSignal::Terminate)
    }
}

impl std::fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlSignal::Interrupt => write!(f, "interrupt"),
            ControlSignal::Terminate => write!(f, "terminate"),
            ControlSignal::Restart => write!(f, "restart"),
        }
    }
}

/// How a supervision cycle concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The child exited with a success status
    ExitedNormally,
    /// The child exited with a failure status, was killed, or could not be waited on
    ExitedWithError,
    /// A restart request stopped the child
    RestartRequested,
    /// A shutdown signal stopped the child
    ShutdownRequested,
}

impl CycleOutcome {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, CycleOutcome::ShutdownRequested)
    }
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleOutcome::ExitedNormally => write!(f, "exited"),
            CycleOutcome::ExitedWithError => write!(f, "exited with error"),
            CycleOutcome::RestartRequested => write!(f, "restart requested"),
            CycleOutcome::ShutdownRequested => write!(f, "shutdown requested"),
        }
    }
}

/// Result of one attempt to run the command
#[derive(Debug, Clone)]
pub struct SupervisionCycle {
    pub pid: u32,
    pub outcome: CycleOutcome,
    pub elapsed: Duration,
    /// Recorded as the last error on the status page
    pub error: Option<String>,
}

/// A child launched for one supervision cycle
#[derive(Debug)]
pub struct SpawnedProcess {
    /// The child process handle
    pub child: Child,

    /// Process ID assigned by the OS
    pub pid: u32,

    /// Directory the child runs in
    pub working_dir: PathBuf,

    pub started_at: SystemTime,
}

/// What graceful termination had to do to stop a child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The child was already gone; nothing was sent
    AlreadyExited,
    /// The child exited within the grace period after SIGINT
    Interrupted,
    /// The child ignored SIGINT and was killed
    Killed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_signal_shutdown_kinds() {
        assert!(ControlSignal::Interrupt.is_shutdown());
        assert!(ControlSignal::Terminate.is_shutdown());
        assert!(!ControlSignal::Restart.is_shutdown());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(CycleOutcome::ExitedNormally.to_string(), "exited");
        assert_eq!(CycleOutcome::ShutdownRequested.to_string(), "shutdown requested");
        assert!(CycleOutcome::ShutdownRequested.is_shutdown());
        assert!(!CycleOutcome::RestartRequested.is_shutdown());
    }
}
