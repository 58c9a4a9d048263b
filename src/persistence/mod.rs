//! Persistence layer: storage capabilities and their backends.
//!
//! The registry depends only on the three capability traits below. Two
//! backends implement all of them:
//!
//! - [`memory::MemoryStore`]: per-row async locks in process memory, for
//!   single-node deployments and tests.
//! - [`postgres::PostgresStore`]: `sqlx::PgPool` with embedded migrations;
//!   sub-records live in JSONB columns.
//!
//! The backend is chosen once at startup and bundled into [`Stores`].

pub mod memory;
pub mod models;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    BungeeConfig, Lockdown, PingStatus, PlayerProfile, PushOutcome, ServerEntry, ServerUpdate,
};
use crate::error::NebulaError;

/// Keyed storage of server entries.
#[async_trait]
pub trait ServerStore: Send + Sync + std::fmt::Debug {
    /// Inserts a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::AlreadyExists`] if the name is taken; the
    /// check and the insert are one atomic step.
    async fn insert_server(&self, entry: &ServerEntry) -> Result<(), NebulaError>;

    /// Deletes an entry, returning `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn delete_server(&self, name: &str) -> Result<bool, NebulaError>;

    /// Reads one entry.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn get_server(&self, name: &str) -> Result<Option<ServerEntry>, NebulaError>;

    /// Reads all entries, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn list_servers(&self) -> Result<Vec<ServerEntry>, NebulaError>;

    /// Applies a partial update, returning the new entry if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn update_server(
        &self,
        name: &str,
        update: &ServerUpdate,
    ) -> Result<Option<ServerEntry>, NebulaError>;

    /// Replaces the lockdown record, returning the new entry if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn set_lockdown(
        &self,
        name: &str,
        lockdown: &Lockdown,
    ) -> Result<Option<ServerEntry>, NebulaError>;

    /// Overwrites the status of an entry and reports whether it changed.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn push_status(&self, name: &str, status: &PingStatus)
    -> Result<PushOutcome, NebulaError>;
}

/// Exclusive lock on one player row.
///
/// Holding the lock excludes every other lock on the same uuid. Dropping
/// it without calling [`commit`](Self::commit) releases the lock and
/// leaves the row untouched.
#[async_trait]
pub trait PlayerRowLock: Send {
    /// The row as it was when the lock was taken; `None` if absent.
    fn current(&self) -> Option<&PlayerProfile>;

    /// Writes `profile` as the row and releases the lock.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure; the row is left
    /// as it was.
    async fn commit(self: Box<Self>, profile: PlayerProfile) -> Result<(), NebulaError>;
}

/// Keyed storage of player profiles.
#[async_trait]
pub trait PlayerStore: Send + Sync + std::fmt::Debug {
    /// Takes the exclusive lock on the row for `uuid`, waiting at most the
    /// backend's configured lock timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] if the wait times out or the
    /// backend fails.
    async fn lock_player(&self, uuid: &str) -> Result<Box<dyn PlayerRowLock>, NebulaError>;

    /// Reads one player.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn get_player(&self, uuid: &str) -> Result<Option<PlayerProfile>, NebulaError>;

    /// Reads every player with a non-empty current server.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn list_online_players(&self) -> Result<Vec<PlayerProfile>, NebulaError>;

    /// Upserts every profile unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn upsert_players(&self, profiles: &[PlayerProfile]) -> Result<(), NebulaError>;
}

/// Storage of the proxy configuration singleton.
#[async_trait]
pub trait ConfigStore: Send + Sync + std::fmt::Debug {
    /// Reads the singleton, or the default record if none was stored.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn get_bungee(&self) -> Result<BungeeConfig, NebulaError>;

    /// Sets the MOTD, returning the new record.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn set_motd(&self, motd: &str) -> Result<BungeeConfig, NebulaError>;

    /// Sets the favicon, returning the new record.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] on backend failure.
    async fn set_favicon(&self, favicon: &str) -> Result<BungeeConfig, NebulaError>;
}

/// The three capabilities, usually backed by one store.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Server entries.
    pub servers: Arc<dyn ServerStore>,
    /// Player profiles.
    pub players: Arc<dyn PlayerStore>,
    /// Proxy configuration.
    pub config: Arc<dyn ConfigStore>,
}

impl Stores {
    /// Uses one backend for all three capabilities.
    #[must_use]
    pub fn from_backend<S>(store: Arc<S>) -> Self
    where
        S: ServerStore + PlayerStore + ConfigStore + 'static,
    {
        Self {
            servers: Arc::clone(&store) as Arc<dyn ServerStore>,
            players: Arc::clone(&store) as Arc<dyn PlayerStore>,
            config: store,
        }
    }
}
