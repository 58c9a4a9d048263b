//! Backend server entry with its lockdown flag and last probed status.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message shown to players when a server is locked down without a reason.
pub const DEFAULT_LOCKDOWN_DESCRIPTION: &str = "&cThis server currently not available";

/// One named, addressable backend server tracked by the registry.
///
/// `name` is the unique key and never changes after creation. The
/// `status` field is owned by the health scheduler and overwritten
/// wholesale on every probe cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ServerEntry {
    /// Unique registry key.
    pub name: String,
    /// Name shown to players.
    pub display_name: String,
    /// Host name or IP address the proxy connects to.
    pub address: String,
    /// TCP port the proxy connects to.
    pub port: u16,
    /// Server-specific message of the day.
    pub motd: String,
    /// Whether players may be sent here when their server goes away.
    pub fallback: bool,
    /// Administrative lockdown flag.
    pub lockdown: Lockdown,
    /// Last probed live status.
    pub status: PingStatus,
}

impl ServerEntry {
    /// Creates an entry with empty presentation fields, no lockdown and an
    /// offline status.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            address: address.into(),
            port,
            motd: String::new(),
            fallback: false,
            lockdown: Lockdown::default(),
            status: PingStatus::offline(),
        }
    }
}

/// Administrative lockdown state of a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Lockdown {
    /// Whether the server is locked down.
    pub enabled: bool,
    /// Reason displayed to players.
    #[serde(default)]
    pub description: String,
}

impl Lockdown {
    /// Builds a lockdown record, substituting [`DEFAULT_LOCKDOWN_DESCRIPTION`]
    /// when enabled without a description.
    #[must_use]
    pub fn new(enabled: bool, description: impl Into<String>) -> Self {
        let mut description = description.into();
        if enabled && description.is_empty() {
            description = DEFAULT_LOCKDOWN_DESCRIPTION.to_string();
        }
        Self {
            enabled,
            description,
        }
    }
}

/// Live status obtained from a status ping.
///
/// The zero value is the offline status: any probe failure produces
/// exactly this value, never a partial merge with a previous status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PingStatus {
    /// Whether the last probe succeeded.
    pub online: bool,
    /// Reported game version.
    pub version: VersionInfo,
    /// Reported player counts.
    pub players: PlayersInfo,
    /// Flattened description text.
    pub description: String,
    /// Base64 data URI of the server icon.
    pub favicon: String,
}

impl PingStatus {
    /// The offline status.
    #[must_use]
    pub fn offline() -> Self {
        Self::default()
    }
}

/// Game version advertised by a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct VersionInfo {
    /// Version name, e.g. `"1.20.1"`.
    pub name: String,
    /// Protocol number.
    pub protocol: i32,
}

/// Player counts advertised by a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PlayersInfo {
    /// Maximum player slots.
    pub max: i32,
    /// Players currently connected.
    pub online: i32,
}

/// Partial update of a server entry's mutable fields.
///
/// `None` leaves a field untouched. The name, lockdown and status are not
/// part of the patch; they have dedicated operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ServerUpdate {
    /// New display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// New address.
    #[serde(default)]
    pub address: Option<String>,
    /// New port.
    #[serde(default)]
    pub port: Option<u16>,
    /// New message of the day.
    #[serde(default)]
    pub motd: Option<String>,
    /// New fallback flag.
    #[serde(default)]
    pub fallback: Option<bool>,
}

impl ServerUpdate {
    /// Applies the patch to `entry` in place.
    pub fn apply(&self, entry: &mut ServerEntry) {
        if let Some(display_name) = &self.display_name {
            entry.display_name.clone_from(display_name);
        }
        if let Some(address) = &self.address {
            entry.address.clone_from(address);
        }
        if let Some(port) = self.port {
            entry.port = port;
        }
        if let Some(motd) = &self.motd {
            entry.motd.clone_from(motd);
        }
        if let Some(fallback) = self.fallback {
            entry.fallback = fallback;
        }
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of writing a probed status back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// No entry with that name; nothing written.
    NotFound,
    /// The stored status already equaled the new one.
    Unchanged,
    /// The stored status was replaced.
    Changed,
}
