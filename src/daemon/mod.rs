// Daemon module - wires the supervisor, signal listener, and status server

use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::http::{self, AppState};
use crate::logs::OutputSinks;
use crate::process::{
    control_channel, spawn_signal_listener, ControlHandle, ControlReceiver, ResourceReader,
    Supervisor,
};
use crate::redeploy::RedeployTrigger;
use crate::status::StatusHandle;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Owns everything that lives as long as the supervisor process
pub struct Daemon {
    config: Arc<SupervisorConfig>,
    status: StatusHandle,
    control: ControlHandle,
    control_rx: ControlReceiver,
    start_time: Instant,
}

impl Daemon {
    /// Create a daemon for a validated configuration
    pub fn new(config: SupervisorConfig) -> Result<Self> {
        config.validate()?;
        let (control, control_rx) = control_channel();

        Ok(Self {
            config: Arc::new(config),
            status: StatusHandle::new(),
            control,
            control_rx,
            start_time: Instant::now(),
        })
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Handle for requesting restarts or a shutdown from outside
    pub fn control_handle(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Run until a shutdown signal is handled
    ///
    /// Output sinks, the status listener, and the signal handlers are all set
    /// up before the first child is spawned. Any failure there is returned
    /// immediately.
    pub async fn start(self) -> Result<()> {
        let sinks = OutputSinks::open(&self.config)?;
        let status_server = self.start_status_server().await?;
        let signal_listener = spawn_signal_listener(self.control.clone())?;

        let mut supervisor =
            Supervisor::new(&self.config, sinks, self.status.clone(), self.control_rx)?;
        let result = supervisor.run().await;

        signal_listener.abort();
        if let Some(server) = status_server {
            server.abort();
        }

        info!("Supervisor stopped");
        result
    }

    async fn start_status_server(&self) -> Result<Option<JoinHandle<()>>> {
        let Some(addr) = self.config.status_bind_addr()? else {
            return Ok(None);
        };

        let redeploy = match (&self.config.webhook_script, &self.config.webhook_token) {
            (Some(script), Some(_)) => Some(Arc::new(RedeployTrigger::new(
                script.clone(),
                self.status.clone(),
                self.control.clone(),
            ))),
            _ => None,
        };

        let state = AppState {
            config: Arc::clone(&self.config),
            status: self.status.clone(),
            reader: ResourceReader::new(self.config.clock_ticks_per_sec),
            redeploy,
            working_dir: self.config.working_dir()?,
            started_at: self.start_time,
        };

        let listener = http::bind(&addr).await?;
        let router = http::router(state);

        Ok(Some(tokio::spawn(async move {
            if let Err(e) = http::serve(listener, router).await {
                error!("Status server stopped: {}", e);
            }
        })))
    }
}
