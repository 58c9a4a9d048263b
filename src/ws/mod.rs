//! WebSocket layer: the streaming subscription endpoint.
//!
//! `GET /ws/stream?name=…` upgrades to a WebSocket that carries every
//! registry change envelope addressed to the subscriber until a `QUIT`
//! arrives or the client disconnects.

pub mod connection;
pub mod handler;
pub mod messages;
