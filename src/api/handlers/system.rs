//! System endpoints: liveness and storage reachability.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the storage backend cannot be read.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// RFC 3339 time of the check.
    pub checked_at: String,
    /// Registered server entries; absent when storage is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<usize>,
    /// Connected stream subscribers.
    pub subscribers: usize,
}

/// `GET /health` — Liveness plus a storage read.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Reads the server registry to confirm the storage backend answers, and reports the number of connected stream subscribers.",
    responses(
        (status = 200, description = "Storage reachable", body = HealthResponse),
        (status = 503, description = "Storage unreachable", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let servers = match state.registry.get_all_server_entries().await {
        Ok(entries) => Some(entries.len()),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not read storage");
            None
        }
    };
    let (code, status) = if servers.is_some() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checked_at: Utc::now().to_rfc3339(),
        servers,
        subscribers: state.event_bus.subscriber_count(),
    };
    (code, Json(body))
}

/// Root-level routes, outside `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
