//! Player session DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{PlayerProfile, SyncOutcome};

/// Response body for `GET /players`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerListResponse {
    /// Online players sorted by uuid.
    pub data: Vec<PlayerProfile>,
    /// Number of players.
    pub total: usize,
}

/// Response body for login and quit syncs.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    /// Player the sync was for.
    pub uuid: String,
    /// How the sync was resolved.
    pub outcome: SyncOutcome,
    /// `false` only for a superseded quit.
    pub applied: bool,
}

impl SyncResponse {
    /// Builds the response for `uuid`.
    #[must_use]
    pub fn new(uuid: String, outcome: SyncOutcome) -> Self {
        Self {
            uuid,
            outcome,
            applied: outcome != SyncOutcome::QuitSuperseded,
        }
    }
}

/// Response body for `PUT /players`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UpdatePlayersResponse {
    /// Profiles written.
    pub updated: usize,
}
