//! Database row models for servers, players and the proxy configuration.

use sqlx::types::Json;

use crate::domain::{BungeeConfig, Lockdown, PingStatus, PlayerProfile, PlayerProperty, ServerEntry};

/// A row of the `servers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServerRow {
    /// Unique server name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Host or IP.
    pub address: String,
    /// TCP port, stored as `INTEGER`.
    pub port: i32,
    /// Message of the day.
    pub motd: String,
    /// Fallback flag.
    pub fallback: bool,
    /// Lockdown record as JSONB.
    pub lockdown: Json<Lockdown>,
    /// Last probed status as JSONB.
    pub status: Json<PingStatus>,
}

impl From<ServerRow> for ServerEntry {
    fn from(row: ServerRow) -> Self {
        Self {
            name: row.name,
            display_name: row.display_name,
            address: row.address,
            // The column check constraint keeps this in range.
            port: u16::try_from(row.port).unwrap_or_default(),
            motd: row.motd,
            fallback: row.fallback,
            lockdown: row.lockdown.0,
            status: row.status.0,
        }
    }
}

/// A row of the `players` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerRow {
    /// Player uuid.
    pub uuid: String,
    /// Player name.
    pub name: String,
    /// Current server; empty when offline.
    pub current_server: String,
    /// Latency in milliseconds.
    pub latency: i64,
    /// Profile properties as a JSONB array.
    pub properties: Json<Vec<PlayerProperty>>,
}

impl From<PlayerRow> for PlayerProfile {
    fn from(row: PlayerRow) -> Self {
        Self {
            uuid: row.uuid,
            name: row.name,
            current_server: row.current_server,
            latency: row.latency,
            properties: row.properties.0,
        }
    }
}

/// The `bungee` singleton row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BungeeRow {
    /// Message of the day.
    pub motd: String,
    /// Server list icon.
    pub favicon: String,
}

impl From<BungeeRow> for BungeeConfig {
    fn from(row: BungeeRow) -> Self {
        Self {
            motd: row.motd,
            favicon: row.favicon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_row_converts_jsonb_fields() {
        let row = ServerRow {
            name: "lobby".to_string(),
            display_name: "Lobby".to_string(),
            address: "10.0.0.2".to_string(),
            port: 25565,
            motd: String::new(),
            fallback: true,
            lockdown: Json(Lockdown::new(true, "")),
            status: Json(PingStatus::offline()),
        };
        let entry = ServerEntry::from(row);
        assert_eq!(entry.port, 25565);
        assert!(entry.fallback);
        assert!(entry.lockdown.enabled);
        assert!(!entry.lockdown.description.is_empty());
    }

    #[test]
    fn player_row_keeps_property_order() {
        let row = PlayerRow {
            uuid: "u1".to_string(),
            name: "Steve".to_string(),
            current_server: "lobby".to_string(),
            latency: 42,
            properties: Json(vec![
                PlayerProperty {
                    name: "textures".to_string(),
                    value: "abc".to_string(),
                    signature: None,
                },
                PlayerProperty {
                    name: "cape".to_string(),
                    value: "def".to_string(),
                    signature: Some("sig".to_string()),
                },
            ]),
        };
        let profile = PlayerProfile::from(row);
        let names: Vec<&str> = profile.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["textures", "cape"]);
        assert!(profile.is_online());
    }
}
