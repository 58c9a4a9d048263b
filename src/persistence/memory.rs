//! In-process storage with per-row locking.
//!
//! Server entries and player rows each sit behind their own
//! [`tokio::sync::RwLock`] inside an outer map, so writes to different
//! rows never contend. Player rows additionally carry an exclusive gate
//! mutex that backs [`PlayerStore::lock_player`]; bulk roster writes take
//! the same gate, one row at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{ConfigStore, PlayerRowLock, PlayerStore, ServerStore};
use crate::domain::{
    BungeeConfig, Lockdown, PingStatus, PlayerProfile, PushOutcome, ServerEntry, ServerUpdate,
};
use crate::error::NebulaError;

/// Default bound on waiting for a player row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

type PlayerMap = HashMap<String, Arc<PlayerSlot>>;

#[derive(Debug, Default)]
struct PlayerSlot {
    gate: Arc<Mutex<()>>,
    profile: RwLock<Option<PlayerProfile>>,
}

/// Memory-backed implementation of every storage capability.
#[derive(Debug)]
pub struct MemoryStore {
    servers: RwLock<HashMap<String, Arc<RwLock<ServerEntry>>>>,
    players: Arc<RwLock<PlayerMap>>,
    bungee: RwLock<BungeeConfig>,
    lock_timeout: Duration,
}

impl MemoryStore {
    /// Creates an empty store whose player locks wait at most
    /// `lock_timeout`.
    #[must_use]
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            players: Arc::new(RwLock::new(HashMap::new())),
            bungee: RwLock::new(BungeeConfig::default()),
            lock_timeout,
        }
    }

    async fn server_slot(&self, name: &str) -> Option<Arc<RwLock<ServerEntry>>> {
        self.servers.read().await.get(name).cloned()
    }

    async fn player_slot(&self, uuid: &str) -> Arc<PlayerSlot> {
        if let Some(slot) = self.players.read().await.get(uuid) {
            return Arc::clone(slot);
        }
        let mut map = self.players.write().await;
        Arc::clone(map.entry(uuid.to_string()).or_default())
    }

    async fn acquire_gate(
        &self,
        uuid: &str,
        slot: &PlayerSlot,
    ) -> Result<OwnedMutexGuard<()>, NebulaError> {
        tokio::time::timeout(self.lock_timeout, Arc::clone(&slot.gate).lock_owned())
            .await
            .map_err(|_| {
                NebulaError::Storage(format!("lock wait timeout exceeded for player {uuid}"))
            })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

#[async_trait]
impl ServerStore for MemoryStore {
    async fn insert_server(&self, entry: &ServerEntry) -> Result<(), NebulaError> {
        let mut map = self.servers.write().await;
        if map.contains_key(&entry.name) {
            return Err(NebulaError::AlreadyExists(entry.name.clone()));
        }
        map.insert(entry.name.clone(), Arc::new(RwLock::new(entry.clone())));
        Ok(())
    }

    async fn delete_server(&self, name: &str) -> Result<bool, NebulaError> {
        Ok(self.servers.write().await.remove(name).is_some())
    }

    async fn get_server(&self, name: &str) -> Result<Option<ServerEntry>, NebulaError> {
        let Some(slot) = self.server_slot(name).await else {
            return Ok(None);
        };
        let entry = slot.read().await.clone();
        Ok(Some(entry))
    }

    async fn list_servers(&self) -> Result<Vec<ServerEntry>, NebulaError> {
        let slots: Vec<Arc<RwLock<ServerEntry>>> =
            self.servers.read().await.values().cloned().collect();
        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            entries.push(slot.read().await.clone());
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn update_server(
        &self,
        name: &str,
        update: &ServerUpdate,
    ) -> Result<Option<ServerEntry>, NebulaError> {
        let Some(slot) = self.server_slot(name).await else {
            return Ok(None);
        };
        let mut entry = slot.write().await;
        update.apply(&mut entry);
        Ok(Some(entry.clone()))
    }

    async fn set_lockdown(
        &self,
        name: &str,
        lockdown: &Lockdown,
    ) -> Result<Option<ServerEntry>, NebulaError> {
        let Some(slot) = self.server_slot(name).await else {
            return Ok(None);
        };
        let mut entry = slot.write().await;
        entry.lockdown = lockdown.clone();
        Ok(Some(entry.clone()))
    }

    async fn push_status(
        &self,
        name: &str,
        status: &PingStatus,
    ) -> Result<PushOutcome, NebulaError> {
        let Some(slot) = self.server_slot(name).await else {
            return Ok(PushOutcome::NotFound);
        };
        let mut entry = slot.write().await;
        if entry.status == *status {
            return Ok(PushOutcome::Unchanged);
        }
        entry.status = status.clone();
        Ok(PushOutcome::Changed)
    }
}

struct MemoryRowLock {
    uuid: String,
    slot: Arc<PlayerSlot>,
    players: Arc<RwLock<PlayerMap>>,
    current: Option<PlayerProfile>,
    _gate: OwnedMutexGuard<()>,
}

impl Drop for MemoryRowLock {
    // A lock taken on an unknown uuid and released without a commit leaves
    // an empty slot behind; drop it unless someone else still holds it.
    fn drop(&mut self) {
        let vacant = self.slot.profile.try_read().is_ok_and(|p| p.is_none());
        if !vacant {
            return;
        }
        if let Ok(mut map) = self.players.try_write()
            && Arc::strong_count(&self.slot) == 2
            && map
                .get(&self.uuid)
                .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot))
        {
            map.remove(&self.uuid);
        }
    }
}

#[async_trait]
impl PlayerRowLock for MemoryRowLock {
    fn current(&self) -> Option<&PlayerProfile> {
        self.current.as_ref()
    }

    async fn commit(self: Box<Self>, profile: PlayerProfile) -> Result<(), NebulaError> {
        *self.slot.profile.write().await = Some(profile);
        Ok(())
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn lock_player(&self, uuid: &str) -> Result<Box<dyn PlayerRowLock>, NebulaError> {
        let slot = self.player_slot(uuid).await;
        let gate = self.acquire_gate(uuid, &slot).await?;
        let current = slot.profile.read().await.clone();
        Ok(Box::new(MemoryRowLock {
            uuid: uuid.to_string(),
            slot,
            players: Arc::clone(&self.players),
            current,
            _gate: gate,
        }))
    }

    async fn get_player(&self, uuid: &str) -> Result<Option<PlayerProfile>, NebulaError> {
        let Some(slot) = self.players.read().await.get(uuid).cloned() else {
            return Ok(None);
        };
        let profile = slot.profile.read().await.clone();
        Ok(profile)
    }

    async fn list_online_players(&self) -> Result<Vec<PlayerProfile>, NebulaError> {
        let slots: Vec<Arc<PlayerSlot>> = self.players.read().await.values().cloned().collect();
        let mut online = Vec::new();
        for slot in slots {
            if let Some(profile) = slot.profile.read().await.as_ref()
                && profile.is_online()
            {
                online.push(profile.clone());
            }
        }
        online.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        Ok(online)
    }

    async fn upsert_players(&self, profiles: &[PlayerProfile]) -> Result<(), NebulaError> {
        for profile in profiles {
            let slot = self.player_slot(&profile.uuid).await;
            let _gate = self.acquire_gate(&profile.uuid, &slot).await?;
            *slot.profile.write().await = Some(profile.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get_bungee(&self) -> Result<BungeeConfig, NebulaError> {
        Ok(self.bungee.read().await.clone())
    }

    async fn set_motd(&self, motd: &str) -> Result<BungeeConfig, NebulaError> {
        let mut config = self.bungee.write().await;
        motd.clone_into(&mut config.motd);
        Ok(config.clone())
    }

    async fn set_favicon(&self, favicon: &str) -> Result<BungeeConfig, NebulaError> {
        let mut config = self.bungee.write().await;
        favicon.clone_into(&mut config.favicon);
        Ok(config.clone())
    }
}
