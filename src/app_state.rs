//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{IpReputationClient, Registry};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry for all server, proxy and player operations.
    pub registry: Arc<Registry>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// IP reputation client; `None` when no token is configured.
    pub ip_lookup: Option<Arc<IpReputationClient>>,
}

impl AppState {
    /// Builds the state around `registry`, sharing its event bus.
    #[must_use]
    pub fn new(registry: Arc<Registry>, ip_lookup: Option<Arc<IpReputationClient>>) -> Self {
        let event_bus = registry.event_bus().clone();
        Self {
            registry,
            event_bus,
            ip_lookup,
        }
    }
}
