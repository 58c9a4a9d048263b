//! WebSocket stream delivery against a live listener.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use nebula_gateway::api::build_app;
use nebula_gateway::app_state::AppState;
use nebula_gateway::domain::{EventBus, LocalPublisher, ServerEntry};
use nebula_gateway::persistence::Stores;
use nebula_gateway::persistence::memory::MemoryStore;
use nebula_gateway::service::Registry;

type Client =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn start() -> (String, Arc<Registry>) {
    let bus = EventBus::new(Arc::new(LocalPublisher::new(64)), 16);
    let stores = Stores::from_backend(Arc::new(MemoryStore::default()));
    let registry = Arc::new(Registry::new(stores, bus));
    let app = build_app(
        AppState::new(Arc::clone(&registry), None),
        Duration::from_secs(5),
    );

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("ws://{addr}/ws/stream"), registry)
}

async fn connect(base: &str, name: &str, registry: &Registry) -> Client {
    let before = registry.event_bus().subscriber_count();
    let Ok((client, _)) = tokio_tungstenite::connect_async(format!("{base}?name={name}")).await
    else {
        panic!("ws connect failed");
    };
    // The subscription is registered by the upgrade handler.
    for _ in 0..100 {
        if registry.event_bus().subscriber_count() > before {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    client
}

async fn next_event(client: &mut Client) -> Value {
    loop {
        let next = tokio::time::timeout(Duration::from_secs(2), client.next()).await;
        let Ok(Some(Ok(message))) = next else {
            panic!("event expected");
        };
        if let Message::Text(text) = message {
            let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("event must be json");
            };
            return value;
        }
    }
}

#[tokio::test]
async fn targeted_command_reaches_only_its_proxy() {
    let (base, registry) = start().await;
    let mut p1 = connect(&base, "proxy-1", &registry).await;
    let mut p2 = connect(&base, "proxy-2", &registry).await;

    assert!(
        registry
            .send_bungee_command("alert hi", Some("proxy-1"))
            .await
            .is_ok()
    );
    assert!(
        registry
            .add_server_entry(ServerEntry::new("lobby", "10.0.0.2", 25565))
            .await
            .is_ok()
    );

    let first = next_event(&mut p1).await;
    assert_eq!(first["type"], "event");
    assert_eq!(first["payload"]["type"], "COMMAND");
    assert_eq!(first["payload"]["command"], "alert hi");
    let second = next_event(&mut p1).await;
    assert_eq!(second["payload"]["entry"]["name"], "lobby");

    let only = next_event(&mut p2).await;
    assert_eq!(only["payload"]["type"], "SYNC");
}

#[tokio::test]
async fn quit_closes_the_socket_normally() {
    let (base, registry) = start().await;
    let mut p1 = connect(&base, "proxy-1", &registry).await;
    let mut p2 = connect(&base, "proxy-2", &registry).await;

    assert!(
        registry
            .quit_stream(Some("proxy-1".to_string()))
            .await
            .is_ok()
    );

    let mut closed = None;
    while let Ok(Some(Ok(message))) = tokio::time::timeout(Duration::from_secs(2), p1.next()).await
    {
        if let Message::Close(frame) = message {
            closed = frame;
            break;
        }
    }
    let Some(frame) = closed else {
        panic!("close frame expected");
    };
    assert_eq!(frame.code, CloseCode::Normal);
    assert_eq!(frame.reason.as_str(), "quit");

    // proxy-2 keeps streaming.
    let _ = registry.set_motd("still here").await;
    let event = next_event(&mut p2).await;
    assert_eq!(event["payload"]["entry"]["motd"], "still here");
}

#[tokio::test]
async fn empty_name_is_rejected() {
    let (base, _registry) = start().await;
    let result = tokio_tungstenite::connect_async(format!("{base}?name=")).await;
    assert!(result.is_err());
}
