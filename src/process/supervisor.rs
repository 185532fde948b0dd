use crate::config::SupervisorConfig;
use crate::error::{BabysitError, Result};
use crate::logs::OutputSinks;
use crate::process::control::ControlReceiver;
use crate::process::spawner::spawn_child;
use crate::process::terminate::terminate_gracefully;
use crate::process::types::{ControlSignal, CycleOutcome, SupervisionCycle};
use crate::status::StatusHandle;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tracing::{debug, error, info, warn};

/// What woke up the supervisor during a cycle
#[derive(Debug)]
enum CycleEvent {
    Exited(std::io::Result<ExitStatus>),
    Signal(ControlSignal),
}

/// How the restart delay ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelayEnd {
    Elapsed,
    Restart,
    Shutdown(ControlSignal),
}

/// Keeps a single command alive: one supervision cycle at a time, restarted
/// after a fixed delay until a shutdown signal arrives
pub struct Supervisor {
    command: Vec<String>,
    working_dir: PathBuf,
    restart_delay: Duration,
    grace_period: Duration,
    sinks: OutputSinks,
    status: StatusHandle,
    control: ControlReceiver,
}

impl Supervisor {
    /// Create a supervisor for the configured command
    ///
    /// # Arguments
    /// * `config` - Validated supervisor configuration
    /// * `sinks` - Output targets attached to every child
    /// * `status` - Shared snapshot this supervisor publishes to
    /// * `control` - Receiving end of the control channel
    pub fn new(
        config: &SupervisorConfig,
        sinks: OutputSinks,
        status: StatusHandle,
        control: ControlReceiver,
    ) -> Result<Self> {
        if config.command.is_empty() {
            return Err(BabysitError::MissingConfigField("command".to_string()));
        }

        Ok(Self {
            command: config.command.clone(),
            working_dir: config.working_dir()?,
            restart_delay: config.restart_delay(),
            grace_period: config.grace_period(),
            sinks,
            status,
            control,
        })
    }

    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    /// Run cycles until a shutdown signal is received
    ///
    /// Returns `Ok(())` only through the shutdown path; spawn failures and
    /// abnormal exits are logged and retried after the restart delay.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            command = %self.command.join(" "),
            dir = %self.working_dir.display(),
            restart_delay_ms = self.restart_delay.as_millis() as u64,
            "Starting supervisor"
        );

        loop {
            let result = self.run_cycle().await;
            self.sinks.flush();

            match result {
                Ok(cycle) if cycle.outcome.is_shutdown() => {
                    info!("Terminating: shutdown requested");
                    return Ok(());
                }
                Ok(cycle) => {
                    if let Some(ref err) = cycle.error {
                        error!("Run finished with error: {}", err);
                    }
                }
                Err(e) => {
                    error!("Run finished with error: {}", e);
                }
            }

            match self.wait_restart_delay().await {
                DelayEnd::Elapsed => {}
                DelayEnd::Restart => {
                    info!("Restart requested during restart delay, starting child now");
                }
                DelayEnd::Shutdown(signal) => {
                    info!(%signal, "Terminating: shutdown requested between cycles");
                    return Ok(());
                }
            }
        }
    }

    /// Run the command once, from spawn to outcome
    ///
    /// # Returns
    /// * `Ok(SupervisionCycle)` - The cycle concluded (any outcome)
    /// * `Err(BabysitError::SpawnError)` - The child could not be launched;
    ///   the cycle still counts as concluded in the status snapshot
    pub async fn run_cycle(&mut self) -> Result<SupervisionCycle> {
        let started = Instant::now();

        let mut spawned = match spawn_child(&self.command, &self.working_dir, &self.sinks) {
            Ok(spawned) => spawned,
            Err(e) => {
                self.status.cycle_finished(Some(e.to_string()));
                return Err(e);
            }
        };

        let pid = spawned.pid;
        self.status.cycle_started(pid, spawned.started_at);
        info!(pid, "Started child");

        let event = next_event(&mut spawned.child, &mut self.control).await;

        let (outcome, error) = match event {
            CycleEvent::Exited(Ok(status)) if status.success() => {
                info!(pid, %status, "Child exited");
                (CycleOutcome::ExitedNormally, None)
            }
            CycleEvent::Exited(Ok(status)) => {
                warn!(pid, %status, "Child exited abnormally");
                let err = BabysitError::RuntimeExitError(status.to_string());
                (CycleOutcome::ExitedWithError, Some(err.to_string()))
            }
            CycleEvent::Exited(Err(e)) => {
                warn!(pid, "Failed to wait for child: {}", e);
                let err = BabysitError::RuntimeExitError(format!("wait failed: {}", e));
                (CycleOutcome::ExitedWithError, Some(err.to_string()))
            }
            CycleEvent::Signal(signal) => {
                let outcome = if signal.is_shutdown() {
                    CycleOutcome::ShutdownRequested
                } else {
                    CycleOutcome::RestartRequested
                };
                info!(pid, %signal, "Stopping child");

                let error = match terminate_gracefully(&mut spawned.child, self.grace_period).await
                {
                    Ok(termination) => {
                        debug!(pid, ?termination, "Child stopped");
                        None
                    }
                    Err(e) => {
                        error!(pid, "Failed to stop child: {}", e);
                        Some(e.to_string())
                    }
                };

                (outcome, error)
            }
        };

        let elapsed = started.elapsed();
        self.status.cycle_finished(error.clone());
        info!(pid, %outcome, elapsed_ms = elapsed.as_millis() as u64, "Cycle finished");

        Ok(SupervisionCycle {
            pid,
            outcome,
            elapsed,
            error,
        })
    }

    /// Sleep for the restart delay, still honouring control requests
    async fn wait_restart_delay(&mut self) -> DelayEnd {
        tokio::select! {
            _ = tokio::time::sleep(self.restart_delay) => DelayEnd::Elapsed,
            Some(signal) = self.control.recv() => {
                if signal.is_shutdown() {
                    DelayEnd::Shutdown(signal)
                } else {
                    DelayEnd::Restart
                }
            }
        }
    }
}

/// Race child exit against the next control request.
///
/// Biased towards the exit: when the child is already gone and a request is
/// pending, the exit wins and the request stays queued.
async fn next_event(child: &mut Child, control: &mut ControlReceiver) -> CycleEvent {
    tokio::select! {
        biased;
        status = child.wait() => CycleEvent::Exited(status),
        Some(signal) = control.recv() => CycleEvent::Signal(signal),
    }
}
