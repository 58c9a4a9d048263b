//! # nebula-gateway
//!
//! Control plane for a proxied game server network.
//!
//! The gateway keeps the registry of backend servers, the proxy-wide
//! configuration and the player roster. It probes every server with the
//! status ping protocol in the background, and it propagates every change
//! to the proxies over pub/sub channels and long-lived WebSocket streams.
//!
//! ## Architecture
//!
//! ```text
//! Proxies / admin tools (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── Stream Handler (ws/)
//!     │
//!     ├── Registry + PlayerSessionResolver (service/)
//!     ├── HealthScheduler (service/) ── Prober (protocol/)
//!     ├── EventBus ── ChannelPublisher: Redis | in-process (domain/)
//!     │
//!     └── ServerStore / PlayerStore / ConfigStore: memory | PostgreSQL (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod protocol;
pub mod service;
pub mod ws;
