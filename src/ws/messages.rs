//! WebSocket message types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Envelope;

/// Top-level WebSocket message sent to stream subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct WsMessage {
    /// Server-generated message id.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Server → Client registry change envelope.
    Event,
    /// Server → Client error.
    Error,
}

impl WsMessage {
    /// Wraps a registry change envelope.
    #[must_use]
    pub fn event(envelope: &Envelope) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            msg_type: WsMessageType::Event,
            timestamp: Utc::now(),
            payload: serde_json::to_value(envelope).unwrap_or_default(),
        }
    }

    /// Builds an error message.
    #[must_use]
    pub fn error(code: u16, message: &str) -> Self {
        Self {
            id: String::new(),
            msg_type: WsMessageType::Error,
            timestamp: Utc::now(),
            payload: serde_json::json!({
                "code": code,
                "message": message,
            }),
        }
    }

    /// Serializes the message for a text frame.
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}
