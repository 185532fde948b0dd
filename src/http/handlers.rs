use crate::http::AppState;
use crate::status::page::{render_status_page, StatusPage, SystemInfo};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::Html;
use tracing::{error, warn};

/// `GET /`: the HTML status page
pub async fn status_page(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.status.snapshot();
    // An exited child's PID may already belong to another process
    let usage = if snapshot.running {
        Some(
            state
                .reader
                .read(snapshot.pid)
                .await
                .map_err(|e| e.to_string()),
        )
    } else {
        None
    };

    let working_dir = state.working_dir.clone();
    let system = tokio::task::spawn_blocking(move || SystemInfo::collect(&working_dir))
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to collect system info: {}", e);
            SystemInfo::default()
        });

    let page = StatusPage::new(
        &state.config,
        snapshot,
        usage,
        state.started_at.elapsed(),
        system,
    );

    Html(render_status_page(&page))
}

/// `/webhook/<token>`: run the redeploy script, then restart the child
///
/// Only POST bodies are forwarded to the script. The invocation runs on its
/// own task so a client hanging up does not abort it halfway.
pub async fn webhook(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> (StatusCode, String) {
    let Some(trigger) = state.redeploy.clone() else {
        return (StatusCode::NOT_FOUND, "webhook not installed".to_string());
    };

    let body = (method == Method::POST).then_some(body);

    let result = tokio::spawn(async move { trigger.run(body.as_deref()).await }).await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, "ok".to_string()),
        Ok(Err(e)) => {
            error!("Redeploy failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("Redeploy task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
