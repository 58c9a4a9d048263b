//! Stream control handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{QuitStreamRequest, QuitStreamResponse};
use crate::app_state::AppState;
use crate::error::NebulaError;

/// `POST /streams/quit` — Close streaming subscriptions.
///
/// # Errors
///
/// Returns [`NebulaError::Publish`] if the envelope cannot be published.
#[utoipa::path(
    post,
    path = "/api/v1/streams/quit",
    tag = "Streams",
    summary = "Close streams",
    description = "Sends QUIT to every stream whose name starts with `target`, or to all streams.",
    request_body = QuitStreamRequest,
    responses(
        (status = 200, description = "Streams told to close", body = QuitStreamResponse),
    )
)]
pub async fn quit_streams(
    State(state): State<AppState>,
    Json(req): Json<QuitStreamRequest>,
) -> Result<impl IntoResponse, NebulaError> {
    let closed = state.registry.quit_stream(req.target).await?;
    Ok(Json(QuitStreamResponse { closed }))
}

/// Stream control routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/streams/quit", post(quit_streams))
}
