use crate::error::{BabysitError, Result};
use crate::logs::OutputSinks;
use crate::process::types::SpawnedProcess;
use std::path::Path;
use std::time::SystemTime;
use tokio::process::Command;

/// Spawn one instance of the supervised command
///
/// The child runs in `working_dir` with its stdout and stderr attached to the
/// given sinks. It is killed if its handle is dropped without being reaped.
///
/// # Returns
/// * `Ok(SpawnedProcess)` - Successfully spawned process with metadata
/// * `Err(BabysitError::SpawnError)` - The command could not be launched
pub fn spawn_child(
    command: &[String],
    working_dir: &Path,
    sinks: &OutputSinks,
) -> Result<SpawnedProcess> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| BabysitError::SpawnError("No command specified".to_string()))?;

    let stdout = sinks.stdout.stdio().map_err(|e| {
        BabysitError::SpawnError(format!("Failed to attach stdout for '{}': {}", program, e))
    })?;
    let stderr = sinks.stderr.stdio().map_err(|e| {
        BabysitError::SpawnError(format!("Failed to attach stderr for '{}': {}", program, e))
    })?;

    let child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(std::process::Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            BabysitError::SpawnError(format!("Failed to spawn process '{}': {}", program, e))
        })?;

    let pid = child.id().ok_or_else(|| {
        BabysitError::SpawnError(format!("Failed to get PID for process '{}'", program))
    })?;

    Ok(SpawnedProcess {
        child,
        pid,
        working_dir: working_dir.to_path_buf(),
        started_at: SystemTime::now(),
    })
}
