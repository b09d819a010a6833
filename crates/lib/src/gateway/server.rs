//! Webhook HTTP server: `POST /hooks/:token` and a health probe on `GET /`.

use crate::channels::ChatSender;
use crate::config::{self, Config, WebhookRegistration};
use crate::delivery::{delivery_queue, DeliveryQueue, QueueStats};
use crate::gateway::normalize::normalize;
use crate::routing::find_webhook;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::IntoFuture;
use std::sync::Arc;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Registrations in precedence order; read-only after startup.
    pub webhooks: Arc<[WebhookRegistration]>,
    pub queue: DeliveryQueue,
    pub stats: Arc<QueueStats>,
}

/// Build the router over `state`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/hooks/:token", post(webhook))
        .with_state(state)
}

/// Run the webhook server on `config.listen_address`, delivering through `sender`.
///
/// Returns `Ok` after a graceful shutdown (SIGINT/SIGTERM); payloads still queued at that
/// point are discarded. Returns an error if binding fails or if a send fails: a failed send
/// stops delivery and the caller is expected to exit.
pub async fn run_gateway(config: Config, sender: Arc<dyn ChatSender>) -> Result<()> {
    let bind_addr = config::bind_addr(&config.listen_address);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!(
        "listening on {} ({} webhook(s) registered)",
        bind_addr,
        config.webhooks.len()
    );

    let (queue, worker) = delivery_queue();
    let stats = queue.stats();
    let state = GatewayState {
        webhooks: config.webhooks.into(),
        queue,
        stats: stats.clone(),
    };
    let mut worker_task = tokio::spawn(worker.run(sender));

    let server = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        res = &mut worker_task => {
            match res {
                Ok(Ok(())) => anyhow::bail!("delivery worker stopped unexpectedly"),
                Ok(Err(e)) => Err(e).context("delivery failed"),
                Err(e) => Err(e).context("delivery worker panicked"),
            }
        }
        res = server => {
            worker_task.abort();
            res.context("gateway server exited")?;
            let discarded = stats.pending();
            if discarded > 0 {
                log::warn!("discarding {} undelivered payload(s)", discarded);
            }
            log::info!("gateway stopped");
            Ok(())
        }
    }
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// POST /hooks/:token — token check first, then body parsing, then enqueue.
async fn webhook(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(hook) = find_webhook(&token, &state.webhooks) else {
        log::debug!("webhook rejected: unknown token");
        return (StatusCode::FORBIDDEN, "Invalid token").into_response();
    };
    let msg = match normalize(&headers, &body) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("invalid request for team {}: {}", hook.team, e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    if state.queue.enqueue(hook.payload_for(msg)).is_err() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    StatusCode::OK.into_response()
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "webhooks": state.webhooks.len(),
        "pending": state.stats.pending(),
        "delivered": state.stats.delivered(),
    }))
}
