//! Control Surface (§4.11, §6) — `POST /v1/update` (queue an out-of-band
//! cycle) and `GET /v1/metrics` (Prometheus text), layered with the
//! teacher's `ServiceBuilder` timeout/CORS stack
//! (`cluster::main::build_router`) narrowed to what a single-tenant
//! control surface needs: no CORS origin list (this isn't browser-facing),
//! just the request timeout and an optional bearer-token gate.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

use super::metrics::Metrics;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ControlState {
    pub metrics: Arc<Metrics>,
    pub trigger: mpsc::Sender<()>,
    pub metrics_enabled: bool,
}

pub fn build_router(state: ControlState, token: Option<String>) -> Router {
    let router = Router::new()
        .route("/v1/update", post(update_handler))
        .route("/v1/metrics", get(metrics_handler))
        .with_state(state);

    let router = if let Some(token) = token {
        router.layer(middleware::from_fn_with_state(token, require_bearer_token))
    } else {
        router
    };

    router.layer(ServiceBuilder::new().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        REQUEST_TIMEOUT,
    )))
}

async fn update_handler(State(state): State<ControlState>) -> impl IntoResponse {
    match state.trigger.try_send(()) {
        Ok(()) => StatusCode::NO_CONTENT,
        // The loop already has a pending trigger queued; it will coalesce
        // into a single follow-up cycle, so a full channel is still a
        // successful accept from the caller's point of view.
        Err(mpsc::error::TrySendError::Full(())) => StatusCode::NO_CONTENT,
        Err(mpsc::error::TrySendError::Closed(())) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn metrics_handler(State(state): State<ControlState>) -> impl IntoResponse {
    if !state.metrics_enabled {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "metrics disabled"}))).into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_prometheus(),
    )
        .into_response()
}

async fn require_bearer_token(
    State(token): State<String>,
    req: axum::extract::Request,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(token.as_str()) {
        next.run(req).await
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response()
    }
}
