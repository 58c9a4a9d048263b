//! Login/quit race resolution for player sessions.
//!
//! Proxies report logins and quits independently, so a quit from the
//! previous server can arrive after the login on the next one. Every sync
//! takes the player's exclusive row lock; a quit clears the current
//! server only if the row still names the server the quit came from.

use std::sync::Arc;

use crate::domain::{PlayerProfile, SessionAction, SyncOutcome};
use crate::error::NebulaError;
use crate::persistence::PlayerStore;

/// Result of one resolved sync: the outcome and the row as stored after
/// it. For a superseded quit the row is whatever was already there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// What happened.
    pub outcome: SyncOutcome,
    /// The player row after the sync, `None` if the player is unknown.
    pub profile: Option<PlayerProfile>,
}

/// Applies login and quit syncs under the player's row lock.
#[derive(Debug, Clone)]
pub struct PlayerSessionResolver {
    players: Arc<dyn PlayerStore>,
}

impl PlayerSessionResolver {
    /// Creates a resolver over `players`.
    #[must_use]
    pub fn new(players: Arc<dyn PlayerStore>) -> Self {
        Self { players }
    }

    /// Resolves one sync.
    ///
    /// A login always overwrites the row with `profile`. A quit is
    /// accepted only when the locked row's current server equals
    /// `profile.current_server`; the row's current server is then cleared.
    /// Otherwise the quit is superseded and the row is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] if the lock cannot be taken in
    /// time or the write fails. A superseded quit is not an error.
    pub async fn resolve(
        &self,
        profile: PlayerProfile,
        action: SessionAction,
    ) -> Result<Resolution, NebulaError> {
        let lock = self.players.lock_player(&profile.uuid).await?;

        match action {
            SessionAction::Login => {
                lock.commit(profile.clone()).await?;
                tracing::info!(player = %profile.uuid, server = %profile.current_server, "player logged in");
                Ok(Resolution {
                    outcome: SyncOutcome::LoggedIn,
                    profile: Some(profile),
                })
            }
            SessionAction::Quit => {
                let Some(current) = lock.current().cloned() else {
                    tracing::debug!(player = %profile.uuid, "quit for unknown player ignored");
                    return Ok(Resolution {
                        outcome: SyncOutcome::QuitSuperseded,
                        profile: None,
                    });
                };

                if current.current_server != profile.current_server {
                    // Dropping the lock releases it without a write.
                    drop(lock);
                    tracing::info!(
                        player = %profile.uuid,
                        quit_from = %profile.current_server,
                        now_on = %current.current_server,
                        "stale quit superseded"
                    );
                    return Ok(Resolution {
                        outcome: SyncOutcome::QuitSuperseded,
                        profile: Some(current),
                    });
                }

                let cleared = PlayerProfile {
                    current_server: String::new(),
                    ..current
                };
                lock.commit(cleared.clone()).await?;
                tracing::info!(player = %profile.uuid, server = %profile.current_server, "player quit");
                Ok(Resolution {
                    outcome: SyncOutcome::QuitAccepted,
                    profile: Some(cleared),
                })
            }
        }
    }
}
