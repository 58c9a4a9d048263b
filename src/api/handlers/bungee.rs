//! Proxy configuration handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{CommandRequest, FaviconRequest, MotdRequest};
use crate::app_state::AppState;
use crate::domain::BungeeConfig;
use crate::error::{ErrorResponse, NebulaError};

/// `GET /bungee` — Read the proxy configuration.
///
/// # Errors
///
/// Returns [`NebulaError::Storage`] on backend failure.
#[utoipa::path(
    get,
    path = "/api/v1/bungee",
    tag = "Bungee",
    summary = "Get proxy configuration",
    responses(
        (status = 200, description = "Current configuration", body = BungeeConfig),
    )
)]
pub async fn get_config(State(state): State<AppState>) -> Result<impl IntoResponse, NebulaError> {
    Ok(Json(state.registry.get_bungee_config().await?))
}

/// `PUT /bungee/motd` — Set the network MOTD.
///
/// # Errors
///
/// Returns [`NebulaError::Storage`] on backend failure.
#[utoipa::path(
    put,
    path = "/api/v1/bungee/motd",
    tag = "Bungee",
    summary = "Set MOTD",
    request_body = MotdRequest,
    responses(
        (status = 200, description = "New configuration", body = BungeeConfig),
    )
)]
pub async fn set_motd(
    State(state): State<AppState>,
    Json(req): Json<MotdRequest>,
) -> Result<impl IntoResponse, NebulaError> {
    Ok(Json(state.registry.set_motd(&req.motd).await?))
}

/// `PUT /bungee/favicon` — Set the network favicon.
///
/// # Errors
///
/// Returns [`NebulaError::Storage`] on backend failure.
#[utoipa::path(
    put,
    path = "/api/v1/bungee/favicon",
    tag = "Bungee",
    summary = "Set favicon",
    request_body = FaviconRequest,
    responses(
        (status = 200, description = "New configuration", body = BungeeConfig),
    )
)]
pub async fn set_favicon(
    State(state): State<AppState>,
    Json(req): Json<FaviconRequest>,
) -> Result<impl IntoResponse, NebulaError> {
    Ok(Json(state.registry.set_favicon(&req.favicon).await?))
}

/// `POST /bungee/command` — Broadcast a command to the proxies.
///
/// # Errors
///
/// Returns [`NebulaError::InvalidRequest`] for an empty command.
#[utoipa::path(
    post,
    path = "/api/v1/bungee/command",
    tag = "Bungee",
    summary = "Send proxy command",
    description = "Publishes a COMMAND envelope, optionally targeted at proxies whose name starts with `target`.",
    request_body = CommandRequest,
    responses(
        (status = 202, description = "Command published"),
        (status = 400, description = "Empty command", body = ErrorResponse),
    )
)]
pub async fn send_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Result<impl IntoResponse, NebulaError> {
    state
        .registry
        .send_bungee_command(&req.command, req.target.as_deref())
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// Proxy configuration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bungee", get(get_config))
        .route("/bungee/motd", put(set_motd))
        .route("/bungee/favicon", put(set_favicon))
        .route("/bungee/command", post(send_command))
}
