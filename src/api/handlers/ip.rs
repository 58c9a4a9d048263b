//! IP reputation lookup handler.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::{ErrorResponse, NebulaError};
use crate::service::IpVerdict;

/// `GET /ip/{address}` — Classify a client address.
///
/// # Errors
///
/// Returns [`NebulaError::FeatureDisabled`] when no reputation token is
/// configured, [`NebulaError::InvalidRequest`] for a malformed address and
/// [`NebulaError::Upstream`] when the reputation service fails.
#[utoipa::path(
    get,
    path = "/api/v1/ip/{address}",
    tag = "IP",
    summary = "IP reputation lookup",
    description = "Flags addresses with a medium or high threat level, or in hosting ranges.",
    params(
        ("address" = String, Path, description = "IPv4 or IPv6 address"),
    ),
    responses(
        (status = 200, description = "Verdict", body = IpVerdict),
        (status = 400, description = "Not an IP address", body = ErrorResponse),
        (status = 501, description = "Lookup not configured", body = ErrorResponse),
        (status = 502, description = "Reputation service failed", body = ErrorResponse),
    )
)]
pub async fn lookup(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, NebulaError> {
    let Some(client) = state.ip_lookup.as_ref() else {
        return Err(NebulaError::FeatureDisabled("ip lookup".to_string()));
    };
    Ok(Json(client.lookup(&address).await?))
}

/// IP lookup routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ip/{address}", get(lookup))
}
