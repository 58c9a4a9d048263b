//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; `/health` and the
//! `/ws/stream` upgrade live at the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::stream_handler;

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "nebula-gateway",
        description = "Server registry, proxy configuration, player sessions and change streams for a proxied game network."
    ),
    paths(
        handlers::system::health_handler,
        handlers::servers::list_servers,
        handlers::servers::add_server,
        handlers::servers::get_server,
        handlers::servers::update_server,
        handlers::servers::remove_server,
        handlers::servers::set_lockdown,
        handlers::bungee::get_config,
        handlers::bungee::set_motd,
        handlers::bungee::set_favicon,
        handlers::bungee::send_command,
        handlers::players::list_players,
        handlers::players::update_players,
        handlers::players::get_player,
        handlers::players::login,
        handlers::players::quit,
        handlers::ip::lookup,
        handlers::streams::quit_streams,
        crate::ws::handler::stream_handler,
    ),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Servers", description = "Backend server registry"),
        (name = "Bungee", description = "Proxy-wide configuration and commands"),
        (name = "Players", description = "Player sessions"),
        (name = "IP", description = "IP reputation lookups"),
        (name = "Streams", description = "Streaming change subscriptions"),
    )
)]
pub struct ApiDoc;

/// Builds the REST router: resource endpoints under `/api/v1` plus the
/// root system routes.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the complete application: REST, the WebSocket stream, optional
/// Swagger UI and the HTTP middleware stack.
///
/// `request_timeout` bounds REST requests only; WebSocket streams are
/// long-lived.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let rest = build_router().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        request_timeout,
    ));

    let app = Router::new()
        .merge(rest)
        .route("/ws/stream", get(stream_handler));

    #[cfg(feature = "swagger-ui")]
    let app = app.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
    .with_state(state)
}
