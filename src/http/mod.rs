// HTTP module - status page and redeploy webhook

pub mod handlers;

use crate::config::SupervisorConfig;
use crate::error::{BabysitError, Result};
use crate::process::ResourceReader;
use crate::redeploy::RedeployTrigger;
use crate::status::StatusHandle;
use axum::routing::{any, get};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state of every HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SupervisorConfig>,
    pub status: StatusHandle,
    pub reader: ResourceReader,
    /// Present only when both webhook script and token are configured
    pub redeploy: Option<Arc<RedeployTrigger>>,
    pub working_dir: PathBuf,
    pub started_at: Instant,
}

/// Build the router: `GET /` always, `/webhook/<token>` when installed
pub fn router(state: AppState) -> Router {
    let mut router = Router::new().route("/", get(handlers::status_page));

    if state.redeploy.is_some() {
        if let Some(ref token) = state.config.webhook_token {
            router = router.route(&format!("/webhook/{}", token), any(handlers::webhook));
        }
    }

    router.with_state(state)
}

/// Bind the status listener, resolving host names. Failing here is fatal at startup.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| BabysitError::HttpError(format!("Failed to bind {}: {}", addr, e)))
}

/// Serve the router until the process exits
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(address = %addr, "Status server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| BabysitError::HttpError(e.to_string()))
}
