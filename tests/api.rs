//! REST round trips through the full router.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use nebula_gateway::api::build_app;
use nebula_gateway::app_state::AppState;
use nebula_gateway::domain::{DEFAULT_LOCKDOWN_DESCRIPTION, EventBus, LocalPublisher};
use nebula_gateway::persistence::Stores;
use nebula_gateway::persistence::memory::MemoryStore;
use nebula_gateway::service::Registry;

fn make_app() -> Router {
    let bus = EventBus::new(Arc::new(LocalPublisher::new(64)), 16);
    let stores = Stores::from_backend(Arc::new(MemoryStore::default()));
    let registry = Arc::new(Registry::new(stores, bus));
    build_app(AppState::new(registry, None), Duration::from_secs(5))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    let Ok(request) = request else {
        panic!("request must build");
    };
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router must answer");
    };
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body must read");
    };
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn server(name: &str) -> Value {
    json!({"name": name, "address": "10.0.0.2", "port": 25565})
}

#[tokio::test]
async fn health_reports_storage_and_subscribers() {
    let app = make_app();
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["servers"], 0);
    assert_eq!(body["subscribers"], 0);

    let _ = call(&app, Method::POST, "/api/v1/servers", Some(server("alpha"))).await;
    let (_, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(body["servers"], 1);
}

#[tokio::test]
async fn add_get_and_duplicate_server() {
    let app = make_app();
    let (status, body) = call(&app, Method::POST, "/api/v1/servers", Some(server("alpha"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "alpha");
    assert_eq!(body["status"]["online"], false);

    let (status, body) = call(&app, Method::POST, "/api/v1/servers", Some(server("alpha"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2002);

    let (status, body) = call(&app, Method::GET, "/api/v1/servers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, _) = call(&app, Method::GET, "/api/v1/servers/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lockdown_defaults_description() {
    let app = make_app();
    let _ = call(&app, Method::POST, "/api/v1/servers", Some(server("alpha"))).await;

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/v1/servers/alpha/lockdown",
        Some(json!({"enabled": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lockdown"]["description"], DEFAULT_LOCKDOWN_DESCRIPTION);

    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/v1/servers/ghost/lockdown",
        Some(json!({"enabled": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_and_delete_server() {
    let app = make_app();
    let _ = call(&app, Method::POST, "/api/v1/servers", Some(server("alpha"))).await;

    let (status, body) = call(
        &app,
        Method::PATCH,
        "/api/v1/servers/alpha",
        Some(json!({"motd": "hello", "fallback": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["motd"], "hello");
    assert_eq!(body["fallback"], true);

    let (status, _) = call(&app, Method::DELETE, "/api/v1/servers/alpha", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, "/api/v1/servers/alpha", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn login_switch_and_stale_quit() {
    let app = make_app();
    let login_a = json!({"uuid": "p1", "name": "Steve", "current_server": "A"});
    let login_b = json!({"uuid": "p1", "name": "Steve", "current_server": "B"});

    let (status, body) = call(&app, Method::POST, "/api/v1/players/login", Some(login_a.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "logged_in");
    let _ = call(&app, Method::POST, "/api/v1/players/login", Some(login_b)).await;

    let (status, body) = call(&app, Method::POST, "/api/v1/players/quit", Some(login_a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "quit_superseded");
    assert_eq!(body["applied"], false);

    let (_, body) = call(&app, Method::GET, "/api/v1/players/p1", None).await;
    assert_eq!(body["current_server"], "B");

    let quit_b = json!({"uuid": "p1", "current_server": "B"});
    let (_, body) = call(&app, Method::POST, "/api/v1/players/quit", Some(quit_b)).await;
    assert_eq!(body["outcome"], "quit_accepted");

    let (_, body) = call(&app, Method::GET, "/api/v1/players", None).await;
    assert_eq!(body["total"], 0);
    let (status, _) = call(&app, Method::GET, "/api/v1/players/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn roster_update_lists_online_players() {
    let app = make_app();
    let roster = json!([
        {"uuid": "a", "name": "A", "current_server": "lobby"},
        {"uuid": "b", "name": "B", "current_server": ""}
    ]);
    let (status, body) = call(&app, Method::PUT, "/api/v1/players", Some(roster)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (_, body) = call(&app, Method::GET, "/api/v1/players", None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["uuid"], "a");
}

#[tokio::test]
async fn bungee_config_and_command() {
    let app = make_app();
    let (status, body) = call(&app, Method::GET, "/api/v1/bungee", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["motd"], "");

    let _ = call(&app, Method::PUT, "/api/v1/bungee/motd", Some(json!({"motd": "Welcome"}))).await;
    let (_, body) = call(&app, Method::GET, "/api/v1/bungee", None).await;
    assert_eq!(body["motd"], "Welcome");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/bungee/command",
        Some(json!({"command": "alert restart soon"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/bungee/command",
        Some(json!({"command": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ip_lookup_without_token_is_not_implemented() {
    let app = make_app();
    let (status, body) = call(&app, Method::GET, "/api/v1/ip/203.0.113.7", None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"]["code"], 3003);
}

#[tokio::test]
async fn quit_streams_without_subscribers() {
    let app = make_app();
    let (status, body) = call(&app, Method::POST, "/api/v1/streams/quit", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["closed"], 0);
}
