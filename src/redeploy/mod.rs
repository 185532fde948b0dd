// Redeploy module - runs the webhook script and requests a graceful restart

use crate::error::{BabysitError, Result};
use crate::process::ControlHandle;
use crate::status::StatusHandle;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Shell used to run the redeploy script
const SHELL: &str = "/bin/sh";

/// Runs the configured redeploy script, one invocation at a time
#[derive(Debug)]
pub struct RedeployTrigger {
    script: PathBuf,
    status: StatusHandle,
    control: ControlHandle,
    serial: Mutex<()>,
}

/// Keeps `redeploy_in_progress` set for as long as it lives
struct InProgress<'a> {
    status: &'a StatusHandle,
    completed: bool,
}

impl<'a> InProgress<'a> {
    fn start(status: &'a StatusHandle) -> Self {
        status.redeploy_started();
        Self {
            status,
            completed: false,
        }
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.status.redeploy_finished(self.completed);
    }
}

impl RedeployTrigger {
    pub fn new(script: PathBuf, status: StatusHandle, control: ControlHandle) -> Self {
        Self {
            script,
            status,
            control,
            serial: Mutex::new(()),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Run the script with the request body and restart the child on success
    ///
    /// The body (if any) is written to a temporary file whose path is passed
    /// as the script's only argument. The file is removed when this returns.
    ///
    /// # Returns
    /// * `Ok(())` - The script succeeded and one restart was requested
    /// * `Err(BabysitError::RedeployScriptError)` - The script failed or could
    ///   not be started; the running child is left alone
    pub async fn run(&self, body: Option<&[u8]>) -> Result<()> {
        let _serial = self.serial.lock().await;
        let mut in_progress = InProgress::start(&self.status);

        let params = write_params(body)?;

        info!(script = %self.script.display(), "Running redeploy script");

        let status = Command::new(SHELL)
            .arg(&self.script)
            .arg(params.path())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| {
                error!(script = %self.script.display(), "Failed to start redeploy script: {}", e);
                BabysitError::RedeployScriptError(format!(
                    "failed to start {}: {}",
                    self.script.display(),
                    e
                ))
            })?;

        in_progress.completed = true;

        if !status.success() {
            error!(script = %self.script.display(), %status, "Redeploy script failed");
            return Err(BabysitError::RedeployScriptError(format!(
                "{}: {}",
                self.script.display(),
                status
            )));
        }

        info!("Redeploy script succeeded, requesting restart");
        self.control.request_restart()
    }
}

fn write_params(body: Option<&[u8]>) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("params")
        .tempfile()
        .map_err(|e| BabysitError::RedeployScriptError(format!("tempfile: {}", e)))?;

    if let Some(body) = body {
        write_body(&mut file, body)?;
    }

    Ok(file)
}

fn write_body<W: Write>(writer: &mut W, body: &[u8]) -> Result<()> {
    writer
        .write_all(body)
        .and_then(|_| writer.flush())
        .map_err(|e| BabysitError::RedeployScriptError(format!("params file: {}", e)))
}
