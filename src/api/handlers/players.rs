//! Player session handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{PlayerListResponse, SyncResponse, UpdatePlayersResponse};
use crate::app_state::AppState;
use crate::domain::PlayerProfile;
use crate::error::{ErrorResponse, NebulaError};

/// `GET /players` — List online players.
///
/// # Errors
///
/// Returns [`NebulaError::Storage`] on backend failure.
#[utoipa::path(
    get,
    path = "/api/v1/players",
    tag = "Players",
    summary = "List online players",
    responses(
        (status = 200, description = "Players currently on a server", body = PlayerListResponse),
    )
)]
pub async fn list_players(State(state): State<AppState>) -> Result<impl IntoResponse, NebulaError> {
    let data = state.registry.fetch_all_players().await?;
    Ok(Json(PlayerListResponse {
        total: data.len(),
        data,
    }))
}

/// `PUT /players` — Replace the roster reported by a proxy.
///
/// # Errors
///
/// Returns [`NebulaError::InvalidRequest`] if a profile has no uuid.
#[utoipa::path(
    put,
    path = "/api/v1/players",
    tag = "Players",
    summary = "Update all players",
    description = "Publishes the roster as ADVERTISE_ALL and upserts every profile. An empty roster is ignored.",
    request_body = Vec<PlayerProfile>,
    responses(
        (status = 200, description = "Roster stored", body = UpdatePlayersResponse),
        (status = 400, description = "Invalid profile", body = ErrorResponse),
    )
)]
pub async fn update_players(
    State(state): State<AppState>,
    Json(profiles): Json<Vec<PlayerProfile>>,
) -> Result<impl IntoResponse, NebulaError> {
    let updated = state.registry.update_all_players(profiles).await?;
    Ok(Json(UpdatePlayersResponse { updated }))
}

/// `GET /players/{uuid}` — Get one player, online or not.
///
/// # Errors
///
/// Returns [`NebulaError::PlayerNotFound`] if the uuid was never seen.
#[utoipa::path(
    get,
    path = "/api/v1/players/{uuid}",
    tag = "Players",
    summary = "Get a player",
    params(
        ("uuid" = String, Path, description = "Player uuid"),
    ),
    responses(
        (status = 200, description = "Player profile", body = PlayerProfile),
        (status = 404, description = "Unknown player", body = ErrorResponse),
    )
)]
pub async fn get_player(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, NebulaError> {
    let profile = state
        .registry
        .get_player(&uuid)
        .await?
        .ok_or(NebulaError::PlayerNotFound(uuid))?;
    Ok(Json(profile))
}

/// `POST /players/login` — Login or server switch.
///
/// # Errors
///
/// Returns [`NebulaError::Storage`] if the player lock cannot be taken.
#[utoipa::path(
    post,
    path = "/api/v1/players/login",
    tag = "Players",
    summary = "Player login",
    request_body = PlayerProfile,
    responses(
        (status = 200, description = "Login stored", body = SyncResponse),
        (status = 400, description = "Missing uuid", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(profile): Json<PlayerProfile>,
) -> Result<impl IntoResponse, NebulaError> {
    let uuid = profile.uuid.clone();
    let outcome = state.registry.player_login(profile).await?;
    Ok(Json(SyncResponse::new(uuid, outcome)))
}

/// `POST /players/quit` — Quit from `current_server`.
///
/// # Errors
///
/// Returns [`NebulaError::Storage`] if the player lock cannot be taken.
/// A superseded quit is a successful response with `applied: false`.
#[utoipa::path(
    post,
    path = "/api/v1/players/quit",
    tag = "Players",
    summary = "Player quit",
    description = "Clears the current server only if it still equals the server the quit came from.",
    request_body = PlayerProfile,
    responses(
        (status = 200, description = "Quit accepted or superseded", body = SyncResponse),
        (status = 400, description = "Missing uuid", body = ErrorResponse),
    )
)]
pub async fn quit(
    State(state): State<AppState>,
    Json(profile): Json<PlayerProfile>,
) -> Result<impl IntoResponse, NebulaError> {
    let uuid = profile.uuid.clone();
    let outcome = state.registry.player_quit(profile).await?;
    Ok(Json(SyncResponse::new(uuid, outcome)))
}

/// Player routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/players", get(list_players).put(update_players))
        .route("/players/login", post(login))
        .route("/players/quit", post(quit))
        .route("/players/{uuid}", get(get_player))
}
