//! Proxy configuration DTOs.

use serde::Deserialize;
use utoipa::ToSchema;

/// Request body for `PUT /bungee/motd`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MotdRequest {
    /// New message of the day.
    pub motd: String,
}

/// Request body for `PUT /bungee/favicon`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FaviconRequest {
    /// Base64 encoded icon.
    pub favicon: String,
}

/// Request body for `POST /bungee/command`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommandRequest {
    /// Command line for the proxies to run.
    pub command: String,
    /// Only proxies whose name starts with this receive the command.
    #[serde(default)]
    pub target: Option<String>,
}
