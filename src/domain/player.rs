//! Player profiles and session sync outcomes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A player known to the network.
///
/// Rows are never deleted: a quit only clears `current_server`, so the
/// set of profiles doubles as a historical roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlayerProfile {
    /// Unique player id (game account UUID string).
    pub uuid: String,
    /// Last known player name.
    #[serde(default)]
    pub name: String,
    /// Server the player is on; empty when offline.
    #[serde(default)]
    pub current_server: String,
    /// Last reported latency in milliseconds.
    #[serde(default)]
    pub latency: i64,
    /// Opaque profile properties in the order the proxy sent them.
    #[serde(default)]
    pub properties: Vec<PlayerProperty>,
}

impl PlayerProfile {
    /// Returns `true` if the player is currently on some server.
    #[must_use]
    pub fn is_online(&self) -> bool {
        !self.current_server.is_empty()
    }
}

/// One opaque key/value profile property (skin textures and the like).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlayerProperty {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: String,
    /// Optional signature over the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Direction of a session sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Login or server switch.
    Login,
    /// Quit from the server named in the profile.
    Quit,
}

impl SessionAction {
    /// Maps the wire-level `is_quit` flag to an action.
    #[must_use]
    pub const fn from_is_quit(is_quit: bool) -> Self {
        if is_quit { Self::Quit } else { Self::Login }
    }
}

/// Result of a session sync. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Login or switch stored.
    LoggedIn,
    /// Quit matched the stored server and cleared it.
    QuitAccepted,
    /// Quit did not match the stored server and was discarded.
    QuitSuperseded,
}
