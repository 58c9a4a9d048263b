//! Type-safe stream subscriber identifier.

use std::fmt;

use serde::Serialize;

/// Identifies one streaming subscription on the [`super::EventBus`].
///
/// Subscribers also carry a declared name used for target matching, but
/// names are not unique: a proxy that reconnects gets a fresh id while
/// its stale subscription is still being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubscriberId(uuid::Uuid);

impl SubscriberId {
    /// Creates a new random id (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
