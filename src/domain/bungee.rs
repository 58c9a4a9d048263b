//! Proxy-wide configuration singleton.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Network-wide proxy settings. Exactly one record exists; it is upserted
/// on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct BungeeConfig {
    /// Message of the day shown in the server list.
    pub motd: String,
    /// Base64 encoded server list icon.
    pub favicon: String,
}
