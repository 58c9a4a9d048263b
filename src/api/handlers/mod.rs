//! REST endpoint handlers organized by resource.

pub mod bungee;
pub mod ip;
pub mod players;
pub mod servers;
pub mod streams;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(servers::routes())
        .merge(bungee::routes())
        .merge(players::routes())
        .merge(ip::routes())
        .merge(streams::routes())
}
