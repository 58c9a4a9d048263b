//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use super::connection::run_stream;
use crate::api::dto::StreamQuery;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, NebulaError};

/// `GET /ws/stream?name=…` — Upgrade to a streaming subscription.
///
/// The subscription is registered before the upgrade completes, so no
/// envelope published in between is lost.
///
/// # Errors
///
/// Returns [`NebulaError::InvalidRequest`] for an empty name.
#[utoipa::path(
    get,
    path = "/ws/stream",
    tag = "Streams",
    summary = "Subscribe to registry changes",
    description = "WebSocket upgrade. Each registry change matching the subscriber name arrives as an `event` message; a QUIT closes the socket normally.",
    params(StreamQuery),
    responses(
        (status = 101, description = "Switching to WebSocket"),
        (status = 400, description = "Missing or empty name", body = ErrorResponse),
    )
)]
pub async fn stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<impl IntoResponse, NebulaError> {
    let subscription = state.registry.subscribe(&query.name)?;
    Ok(ws.on_upgrade(move |socket| run_stream(socket, subscription)))
}
