// Status module - Shared supervision state and its HTML rendering

pub mod page;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

/// Point-in-time view of the supervisor, as shown on the status page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    /// A child currently exists
    pub running: bool,
    /// PID of the last spawned child (0 before the first spawn)
    pub pid: u32,
    /// Number of concluded supervision cycles
    pub restart_count: u64,
    /// Error of the last cycle, cleared by a clean outcome
    pub last_error: Option<String>,
    /// Start time of the current (or last) child
    pub process_started_at: Option<SystemTime>,
    /// A redeploy script is running
    pub redeploy_in_progress: bool,
    /// Number of completed redeploy invocations
    pub redeploy_count: u64,
}

/// Cloneable handle to the shared snapshot.
///
/// The supervisor only writes the cycle fields and the redeploy trigger only
/// writes the redeploy fields. Readers always get a whole copy.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of every field
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<F: FnOnce(&mut StatusSnapshot)>(&self, f: F) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// A child was spawned successfully
    pub fn cycle_started(&self, pid: u32, started_at: SystemTime) {
        self.update(|s| {
            s.running = true;
            s.pid = pid;
            s.process_started_at = Some(started_at);
        });
    }

    /// A cycle reached its outcome (including a failed spawn)
    pub fn cycle_finished(&self, last_error: Option<String>) {
        self.update(|s| {
            s.running = false;
            s.restart_count += 1;
            s.last_error = last_error;
        });
    }

    pub fn redeploy_started(&self) {
        self.update(|s| s.redeploy_in_progress = true);
    }

    pub fn redeploy_finished(&self, completed: bool) {
        self.update(|s| {
            s.redeploy_in_progress = false;
            if completed {
                s.redeploy_count += 1;
            }
        });
    }
}
