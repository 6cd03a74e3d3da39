//! HTTP trigger surface.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::dispatch::Dispatcher;
use crate::pipeline::WebhookPayload;

/// Liveness body for `GET /`.
pub const LIVENESS_BODY: &str = "Inbox Agent Webhook Endpoint";

/// Event type the pipeline answers. Other types are acknowledged and ignored.
pub const MESSAGE_RECEIVED: &str = "message.received";

/// Build the webhook router.
pub fn webhook_routes(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/", get(liveness).post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

async fn liveness() -> &'static str {
    LIVENESS_BODY
}

/// POST /
///
/// Always 200 with an empty body, whatever happens to the event.
async fn receive(State(dispatcher): State<Dispatcher>, body: Bytes) -> StatusCode {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Ignoring malformed webhook payload");
            return StatusCode::OK;
        }
    };

    match payload.event_type.as_deref() {
        Some(kind) if kind != MESSAGE_RECEIVED => {
            debug!(event_type = kind, "Ignoring webhook event type");
            return StatusCode::OK;
        }
        _ => {}
    }

    let Some(event) = payload.message else {
        warn!("Webhook payload has no message");
        return StatusCode::OK;
    };

    let thread_id = event.thread_id.clone().unwrap_or_default();
    if let Ok(job_id) = dispatcher.submit(event) {
        info!(job_id = %job_id, thread_id = %thread_id, "Webhook event queued");
    }
    StatusCode::OK
}
