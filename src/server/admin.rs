//! Admin and exposition HTTP API
//!
//! | Method | Path | Effect |
//! |--------|------|--------|
//! | POST | /collections | enable the JSON collection in the body |
//! | DELETE | /collections | disable `{"name": ...}` |
//! | DELETE | /collections/:name | disable by path |
//! | GET | /metrics | text exposition of every enabled collection |
//! | GET | /healthz | liveness |
//!
//! Enable and disable are queued to the aggregation loop and answered with
//! 202; the loop applies them in order.

use crate::engine::{Collection, LoopHandle};
use crate::export::{MetricsExporter, TEXT_CONTENT_TYPE};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    handle: LoopHandle,
    exporter: MetricsExporter,
}

impl AppState {
    pub fn new(handle: LoopHandle, exporter: MetricsExporter) -> Self {
        AppState { handle, exporter }
    }
}

/// Body of `DELETE /collections`
#[derive(Debug, Deserialize)]
pub struct DisableRequest {
    pub name: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/collections",
            post(enable_collection).delete(disable_collection),
        )
        .route("/collections/:name", delete(disable_named))
        .route("/metrics", get(metrics))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn enable_collection(
    State(state): State<AppState>,
    Json(collection): Json<Collection>,
) -> Response {
    if let Err(e) = collection.validate() {
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }
    match state.handle.enable(collection).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn disable_collection(
    State(state): State<AppState>,
    Json(request): Json<DisableRequest>,
) -> Response {
    disable(&state, request.name).await
}

async fn disable_named(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    disable(&state, name).await
}

async fn disable(state: &AppState, name: String) -> Response {
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "collection name is required").into_response();
    }
    match state.handle.disable(name).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn metrics(State(state): State<AppState>) -> Response {
    if state.handle.is_closed() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    match state.exporter.encode_text() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> StatusCode {
    if state.handle.is_closed() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}
