//! Server entry handlers: add, list, get, update, remove, lockdown.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::dto::{CreateServerRequest, LockdownRequest, ServerListResponse};
use crate::app_state::AppState;
use crate::domain::{ServerEntry, ServerUpdate};
use crate::error::{ErrorResponse, NebulaError};

/// `POST /servers` — Register a server entry.
///
/// # Errors
///
/// Returns [`NebulaError::AlreadyExists`] if the name is taken.
#[utoipa::path(
    post,
    path = "/api/v1/servers",
    tag = "Servers",
    summary = "Register a server",
    description = "Adds a backend server. The status starts offline and is filled in by the health scheduler.",
    request_body = CreateServerRequest,
    responses(
        (status = 201, description = "Server registered", body = ServerEntry),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Name already registered", body = ErrorResponse),
    )
)]
pub async fn add_server(
    State(state): State<AppState>,
    Json(req): Json<CreateServerRequest>,
) -> Result<impl IntoResponse, NebulaError> {
    let entry = state.registry.add_server_entry(req.into()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /servers` — List all server entries.
///
/// # Errors
///
/// Returns [`NebulaError::Storage`] on backend failure.
#[utoipa::path(
    get,
    path = "/api/v1/servers",
    tag = "Servers",
    summary = "List servers",
    description = "Returns every registered server with its last probed status, sorted by name.",
    responses(
        (status = 200, description = "Server list", body = ServerListResponse),
    )
)]
pub async fn list_servers(State(state): State<AppState>) -> Result<impl IntoResponse, NebulaError> {
    let data = state.registry.get_all_server_entries().await?;
    Ok(Json(ServerListResponse {
        total: data.len(),
        data,
    }))
}

/// `GET /servers/{name}` — Get one server entry.
///
/// # Errors
///
/// Returns [`NebulaError::ServerNotFound`] if absent.
#[utoipa::path(
    get,
    path = "/api/v1/servers/{name}",
    tag = "Servers",
    summary = "Get a server",
    params(
        ("name" = String, Path, description = "Server name"),
    ),
    responses(
        (status = 200, description = "Server entry", body = ServerEntry),
        (status = 404, description = "Server not found", body = ErrorResponse),
    )
)]
pub async fn get_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, NebulaError> {
    Ok(Json(state.registry.get_server_entry(&name).await?))
}

/// `PATCH /servers/{name}` — Update mutable fields of a server entry.
///
/// # Errors
///
/// Returns [`NebulaError::ServerNotFound`] if absent.
#[utoipa::path(
    patch,
    path = "/api/v1/servers/{name}",
    tag = "Servers",
    summary = "Update a server",
    description = "Applies a partial update. The name, lockdown and status cannot be changed here.",
    params(
        ("name" = String, Path, description = "Server name"),
    ),
    request_body = ServerUpdate,
    responses(
        (status = 200, description = "Updated entry", body = ServerEntry),
        (status = 400, description = "Empty or invalid update", body = ErrorResponse),
        (status = 404, description = "Server not found", body = ErrorResponse),
    )
)]
pub async fn update_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(update): Json<ServerUpdate>,
) -> Result<impl IntoResponse, NebulaError> {
    Ok(Json(state.registry.update_server_entry(&name, &update).await?))
}

/// `DELETE /servers/{name}` — Remove a server entry.
///
/// # Errors
///
/// Returns [`NebulaError::Storage`] on backend failure. Removing an
/// unknown name succeeds.
#[utoipa::path(
    delete,
    path = "/api/v1/servers/{name}",
    tag = "Servers",
    summary = "Remove a server",
    description = "Removes a server and publishes a REMOVE envelope. Idempotent.",
    params(
        ("name" = String, Path, description = "Server name"),
    ),
    responses(
        (status = 204, description = "Server removed"),
    )
)]
pub async fn remove_server(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, NebulaError> {
    state.registry.remove_server_entry(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /servers/{name}/lockdown` — Set the lockdown flag.
///
/// # Errors
///
/// Returns [`NebulaError::ServerNotFound`] if absent.
#[utoipa::path(
    put,
    path = "/api/v1/servers/{name}/lockdown",
    tag = "Servers",
    summary = "Set lockdown",
    description = "Enables or disables lockdown. An empty description gets a default message.",
    params(
        ("name" = String, Path, description = "Server name"),
    ),
    request_body = LockdownRequest,
    responses(
        (status = 200, description = "Updated entry", body = ServerEntry),
        (status = 404, description = "Server not found", body = ErrorResponse),
    )
)]
pub async fn set_lockdown(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<LockdownRequest>,
) -> Result<impl IntoResponse, NebulaError> {
    let entry = state
        .registry
        .set_lockdown(&name, req.enabled, &req.description)
        .await?;
    Ok(Json(entry))
}

/// Server entry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/servers", get(list_servers).post(add_server))
        .route(
            "/servers/{name}",
            get(get_server).patch(update_server).delete(remove_server),
        )
        .route("/servers/{name}/lockdown", put(set_lockdown))
}
