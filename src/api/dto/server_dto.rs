//! Server entry DTOs for create, lockdown and list operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Lockdown, ServerEntry};

/// Request body for `POST /servers`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateServerRequest {
    /// Unique server name.
    pub name: String,
    /// Display name; defaults to `name`.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Host or IP the proxies connect to.
    pub address: String,
    /// TCP port the proxies connect to.
    pub port: u16,
    /// Server-specific message of the day.
    #[serde(default)]
    pub motd: String,
    /// Whether players may fall back to this server.
    #[serde(default)]
    pub fallback: bool,
    /// Initial lockdown state.
    #[serde(default)]
    pub lockdown: Option<LockdownRequest>,
}

impl From<CreateServerRequest> for ServerEntry {
    fn from(req: CreateServerRequest) -> Self {
        let mut entry = Self::new(req.name, req.address, req.port);
        if let Some(display_name) = req.display_name {
            entry.display_name = display_name;
        }
        entry.motd = req.motd;
        entry.fallback = req.fallback;
        if let Some(lockdown) = req.lockdown {
            entry.lockdown = Lockdown::new(lockdown.enabled, lockdown.description);
        }
        entry
    }
}

/// Request body for `PUT /servers/{name}/lockdown`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LockdownRequest {
    /// Whether the server is locked down.
    pub enabled: bool,
    /// Reason shown to players; a default is used when empty.
    #[serde(default)]
    pub description: String,
}

/// Response body for `GET /servers`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServerListResponse {
    /// Entries sorted by name.
    pub data: Vec<ServerEntry>,
    /// Number of entries.
    pub total: usize,
}
