//! Registry: server entries, proxy configuration and player sessions.
//!
//! Every mutation follows the same pattern: validate, write through the
//! storage capability, then publish the resulting envelope on the
//! [`EventBus`]. A publish failure is reported to the caller after the
//! write has already happened; the next change or health resync brings
//! consumers back in line.

use std::sync::Arc;

use crate::domain::{
    BungeeConfig, Envelope, EventBus, Lockdown, PingStatus, PlayerProfile, PushOutcome,
    ServerEntry, ServerUpdate, SessionAction, Subscription, SyncOutcome,
};
use crate::error::NebulaError;
use crate::persistence::Stores;

use super::player_session::PlayerSessionResolver;

/// Storage-agnostic owner of all registry state.
#[derive(Debug, Clone)]
pub struct Registry {
    stores: Stores,
    sessions: PlayerSessionResolver,
    event_bus: EventBus,
}

impl Registry {
    /// Creates a registry over `stores`, publishing on `event_bus`.
    #[must_use]
    pub fn new(stores: Stores, event_bus: EventBus) -> Self {
        let sessions = PlayerSessionResolver::new(Arc::clone(&stores.players));
        Self {
            stores,
            sessions,
            event_bus,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // ── Servers ──────────────────────────────────────────────────────────

    /// Registers a new server entry.
    ///
    /// The stored status always starts offline regardless of what the
    /// caller sent; the health scheduler owns it from here on.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::InvalidRequest`] for an empty name or address,
    /// [`NebulaError::AlreadyExists`] if the name is taken, and storage or
    /// publish errors otherwise.
    pub async fn add_server_entry(&self, mut entry: ServerEntry) -> Result<ServerEntry, NebulaError> {
        if entry.name.trim().is_empty() {
            return Err(NebulaError::InvalidRequest("server name must not be empty".to_string()));
        }
        if entry.address.trim().is_empty() {
            return Err(NebulaError::InvalidRequest(
                "server address must not be empty".to_string(),
            ));
        }
        if entry.display_name.is_empty() {
            entry.display_name.clone_from(&entry.name);
        }
        entry.lockdown = Lockdown::new(entry.lockdown.enabled, entry.lockdown.description);
        entry.status = PingStatus::offline();

        self.stores.servers.insert_server(&entry).await?;
        tracing::info!(server = %entry.name, address = %entry.address, port = entry.port, "server entry added");

        self.publish(Envelope::server_sync(entry.clone())).await?;
        Ok(entry)
    }

    /// Removes a server entry, returning `true` if it existed.
    ///
    /// Removing an absent name is not an error; a `REMOVE` envelope is
    /// published either way so consumers drop stale copies.
    ///
    /// # Errors
    ///
    /// Returns storage or publish errors.
    pub async fn remove_server_entry(&self, name: &str) -> Result<bool, NebulaError> {
        let existing = self.stores.servers.get_server(name).await?;
        let removed = self.stores.servers.delete_server(name).await?;
        tracing::info!(server = %name, removed, "server entry removed");

        let entry = existing.unwrap_or_else(|| ServerEntry::new(name, "", 0));
        self.publish(Envelope::server_remove(entry)).await?;
        Ok(removed)
    }

    /// Reads one server entry.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::ServerNotFound`] if absent.
    pub async fn get_server_entry(&self, name: &str) -> Result<ServerEntry, NebulaError> {
        self.stores
            .servers
            .get_server(name)
            .await?
            .ok_or_else(|| NebulaError::ServerNotFound(name.to_string()))
    }

    /// Reads every server entry, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn get_all_server_entries(&self) -> Result<Vec<ServerEntry>, NebulaError> {
        self.stores.servers.list_servers().await
    }

    /// Applies a partial update to a server entry.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::InvalidRequest`] for an empty patch or an
    /// empty address, [`NebulaError::ServerNotFound`] if absent, and
    /// storage or publish errors otherwise.
    pub async fn update_server_entry(
        &self,
        name: &str,
        update: &ServerUpdate,
    ) -> Result<ServerEntry, NebulaError> {
        if update.is_empty() {
            return Err(NebulaError::InvalidRequest("update changes nothing".to_string()));
        }
        if update.address.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(NebulaError::InvalidRequest(
                "server address must not be empty".to_string(),
            ));
        }
        let entry = self
            .stores
            .servers
            .update_server(name, update)
            .await?
            .ok_or_else(|| NebulaError::ServerNotFound(name.to_string()))?;
        tracing::info!(server = %name, "server entry updated");

        self.publish(Envelope::server_sync(entry.clone())).await?;
        Ok(entry)
    }

    /// Sets the lockdown flag of a server entry.
    ///
    /// An enabled lockdown without a description gets the default
    /// placeholder message.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::ServerNotFound`] if absent (nothing is
    /// written), and storage or publish errors otherwise.
    pub async fn set_lockdown(
        &self,
        name: &str,
        enabled: bool,
        description: &str,
    ) -> Result<ServerEntry, NebulaError> {
        let lockdown = Lockdown::new(enabled, description);
        let entry = self
            .stores
            .servers
            .set_lockdown(name, &lockdown)
            .await?
            .ok_or_else(|| NebulaError::ServerNotFound(name.to_string()))?;
        tracing::info!(server = %name, enabled, "lockdown changed");

        self.publish(Envelope::server_sync(entry.clone())).await?;
        Ok(entry)
    }

    /// Writes a probed status back without publishing.
    ///
    /// The health scheduler decides what to publish from the outcome.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn push_status(
        &self,
        name: &str,
        status: &PingStatus,
    ) -> Result<PushOutcome, NebulaError> {
        self.stores.servers.push_status(name, status).await
    }

    /// Publishes the current state of one entry as `SYNC`.
    ///
    /// # Errors
    ///
    /// Returns publish errors.
    pub async fn announce_server(&self, entry: ServerEntry) -> Result<(), NebulaError> {
        self.publish(Envelope::server_sync(entry)).await
    }

    // ── Proxy configuration ──────────────────────────────────────────────

    /// Reads the proxy configuration singleton.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn get_bungee_config(&self) -> Result<BungeeConfig, NebulaError> {
        self.stores.config.get_bungee().await
    }

    /// Sets the network MOTD.
    ///
    /// # Errors
    ///
    /// Returns storage or publish errors.
    pub async fn set_motd(&self, motd: &str) -> Result<BungeeConfig, NebulaError> {
        let config = self.stores.config.set_motd(motd).await?;
        tracing::info!("bungee motd changed");
        self.publish(Envelope::bungee_sync(config.clone())).await?;
        Ok(config)
    }

    /// Sets the network favicon.
    ///
    /// # Errors
    ///
    /// Returns storage or publish errors.
    pub async fn set_favicon(&self, favicon: &str) -> Result<BungeeConfig, NebulaError> {
        let config = self.stores.config.set_favicon(favicon).await?;
        tracing::info!(bytes = favicon.len(), "bungee favicon changed");
        self.publish(Envelope::bungee_sync(config.clone())).await?;
        Ok(config)
    }

    /// Asks the proxies to execute `command`, optionally only those whose
    /// name starts with `target`.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::InvalidRequest`] for an empty command and
    /// publish errors otherwise.
    pub async fn send_bungee_command(
        &self,
        command: &str,
        target: Option<&str>,
    ) -> Result<(), NebulaError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(NebulaError::InvalidRequest("command must not be empty".to_string()));
        }
        let mut envelope = Envelope::bungee_command(command);
        if let Some(target) = target {
            envelope = envelope.with_target(target);
        }
        tracing::info!(command, target = target.unwrap_or(""), "bungee command sent");
        self.publish(envelope).await
    }

    // ── Players ──────────────────────────────────────────────────────────

    /// Applies a login or quit sync and publishes the result.
    ///
    /// Logins publish a players `SYNC`; accepted quits a players `REMOVE`;
    /// superseded quits publish nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::InvalidRequest`] for an empty uuid, and
    /// storage or publish errors otherwise.
    pub async fn sync_player(
        &self,
        profile: PlayerProfile,
        is_quit: bool,
    ) -> Result<SyncOutcome, NebulaError> {
        if profile.uuid.trim().is_empty() {
            return Err(NebulaError::InvalidRequest("player uuid must not be empty".to_string()));
        }
        let resolution = self
            .sessions
            .resolve(profile, SessionAction::from_is_quit(is_quit))
            .await?;

        let envelope = match (resolution.outcome, resolution.profile) {
            (SyncOutcome::LoggedIn, Some(profile)) => Some(Envelope::player_login(profile)),
            (SyncOutcome::QuitAccepted, Some(profile)) => Some(Envelope::player_quit(profile)),
            _ => None,
        };
        if let Some(envelope) = envelope {
            self.publish(envelope).await?;
        }
        Ok(resolution.outcome)
    }

    /// Login or server switch.
    ///
    /// # Errors
    ///
    /// See [`sync_player`](Self::sync_player).
    pub async fn player_login(&self, profile: PlayerProfile) -> Result<SyncOutcome, NebulaError> {
        self.sync_player(profile, false).await
    }

    /// Quit from `profile.current_server`.
    ///
    /// # Errors
    ///
    /// See [`sync_player`](Self::sync_player).
    pub async fn player_quit(&self, profile: PlayerProfile) -> Result<SyncOutcome, NebulaError> {
        self.sync_player(profile, true).await
    }

    /// Reads one player, online or not.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn get_player(&self, uuid: &str) -> Result<Option<PlayerProfile>, NebulaError> {
        self.stores.players.get_player(uuid).await
    }

    /// Reads every player currently on a server.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn fetch_all_players(&self) -> Result<Vec<PlayerProfile>, NebulaError> {
        self.stores.players.list_online_players().await
    }

    /// Replaces the roster with what a proxy reports, returning how many
    /// profiles were written. An empty roster is ignored.
    ///
    /// # Errors
    ///
    /// Returns storage or publish errors.
    pub async fn update_all_players(
        &self,
        profiles: Vec<PlayerProfile>,
    ) -> Result<usize, NebulaError> {
        if profiles.is_empty() {
            return Ok(0);
        }
        if profiles.iter().any(|p| p.uuid.trim().is_empty()) {
            return Err(NebulaError::InvalidRequest("player uuid must not be empty".to_string()));
        }
        let count = profiles.len();
        self.publish(Envelope::players_advertise(profiles.clone())).await?;
        self.stores.players.upsert_players(&profiles).await?;
        tracing::info!(count, "player roster updated");
        Ok(count)
    }

    // ── Streams ──────────────────────────────────────────────────────────

    /// Opens a streaming subscription named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::InvalidRequest`] for an empty name.
    pub fn subscribe(&self, name: &str) -> Result<Subscription, NebulaError> {
        if name.trim().is_empty() {
            return Err(NebulaError::InvalidRequest(
                "subscriber name must not be empty".to_string(),
            ));
        }
        Ok(self.event_bus.subscribe(name))
    }

    /// Closes every stream whose name starts with `target`, or all streams
    /// when `target` is empty. Returns how many were closed.
    ///
    /// # Errors
    ///
    /// Returns publish errors.
    pub async fn quit_stream(&self, target: Option<String>) -> Result<usize, NebulaError> {
        let envelope = Envelope::quit(target);
        tracing::info!(target = envelope.target.as_deref().unwrap_or("*"), "stream quit requested");
        self.event_bus.publish(envelope).await
    }

    async fn publish(&self, envelope: Envelope) -> Result<(), NebulaError> {
        self.event_bus.publish(envelope).await.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        Channel, ChannelMessage, DEFAULT_LOCKDOWN_DESCRIPTION, EventKind, LocalPublisher,
    };
    use crate::persistence::memory::MemoryStore;
    use tokio::sync::broadcast;

    fn make_registry() -> (Registry, broadcast::Receiver<ChannelMessage>) {
        let publisher = LocalPublisher::new(64);
        let rx = publisher.subscribe();
        let bus = EventBus::new(Arc::new(publisher), 16);
        let stores = Stores::from_backend(Arc::new(MemoryStore::default()));
        (Registry::new(stores, bus), rx)
    }

    fn entry(name: &str) -> ServerEntry {
        ServerEntry::new(name, "10.0.0.2", 25565)
    }

    fn profile(uuid: &str, server: &str) -> PlayerProfile {
        PlayerProfile {
            uuid: uuid.to_string(),
            name: "Steve".to_string(),
            current_server: server.to_string(),
            ..PlayerProfile::default()
        }
    }

    fn next_json(rx: &mut broadcast::Receiver<ChannelMessage>) -> (Channel, serde_json::Value) {
        let Ok(message) = rx.try_recv() else {
            panic!("channel message expected");
        };
        let Ok(json) = serde_json::from_str(&message.payload) else {
            panic!("payload must be json");
        };
        (message.channel, json)
    }

    #[tokio::test]
    async fn duplicate_add_fails_and_keeps_count() {
        let (registry, _rx) = make_registry();
        assert!(registry.add_server_entry(entry("alpha")).await.is_ok());

        let second = registry.add_server_entry(entry("alpha")).await;
        assert!(matches!(second, Err(NebulaError::AlreadyExists(_))));

        let Ok(all) = registry.get_all_server_entries().await else {
            panic!("list failed");
        };
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn add_forces_offline_status_and_publishes_sync() {
        let (registry, mut rx) = make_registry();
        let mut incoming = entry("alpha");
        incoming.status.online = true;
        incoming.display_name = String::new();

        let Ok(stored) = registry.add_server_entry(incoming).await else {
            panic!("add failed");
        };
        assert!(!stored.status.online);
        assert_eq!(stored.display_name, "alpha");

        let (channel, json) = next_json(&mut rx);
        assert_eq!(channel, Channel::Servers);
        assert_eq!(json["type"], "SYNC");
        assert_eq!(json["entry"]["name"], "alpha");
    }

    #[tokio::test]
    async fn add_rejects_empty_name() {
        let (registry, _rx) = make_registry();
        let result = registry.add_server_entry(entry(" ")).await;
        assert!(matches!(result, Err(NebulaError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn lockdown_without_reason_uses_default() {
        let (registry, _rx) = make_registry();
        let _ = registry.add_server_entry(entry("alpha")).await;
        assert!(registry.set_lockdown("alpha", true, "").await.is_ok());

        let Ok(stored) = registry.get_server_entry("alpha").await else {
            panic!("entry expected");
        };
        assert!(stored.lockdown.enabled);
        assert_eq!(stored.lockdown.description, DEFAULT_LOCKDOWN_DESCRIPTION);
    }

    #[tokio::test]
    async fn lockdown_on_missing_entry_is_not_found() {
        let (registry, mut rx) = make_registry();
        let result = registry.set_lockdown("ghost", true, "").await;
        assert!(matches!(result, Err(NebulaError::ServerNotFound(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_publishes_remove() {
        let (registry, mut rx) = make_registry();
        let _ = registry.add_server_entry(entry("alpha")).await;
        let _ = next_json(&mut rx);

        assert!(matches!(registry.remove_server_entry("alpha").await, Ok(true)));
        let (_, json) = next_json(&mut rx);
        assert_eq!(json["type"], "REMOVE");
        assert_eq!(json["entry"]["address"], "10.0.0.2");

        assert!(matches!(registry.remove_server_entry("alpha").await, Ok(false)));
        assert!(matches!(
            registry.get_server_entry("alpha").await,
            Err(NebulaError::ServerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_changes_fields_but_not_name() {
        let (registry, _rx) = make_registry();
        let _ = registry.add_server_entry(entry("alpha")).await;
        let update = ServerUpdate {
            display_name: Some("Alpha".to_string()),
            port: Some(25570),
            ..ServerUpdate::default()
        };
        let Ok(updated) = registry.update_server_entry("alpha", &update).await else {
            panic!("update failed");
        };
        assert_eq!(updated.name, "alpha");
        assert_eq!(updated.display_name, "Alpha");
        assert_eq!(updated.port, 25570);

        let empty = registry
            .update_server_entry("alpha", &ServerUpdate::default())
            .await;
        assert!(matches!(empty, Err(NebulaError::InvalidRequest(_))));
        let missing = registry.update_server_entry("ghost", &update).await;
        assert!(matches!(missing, Err(NebulaError::ServerNotFound(_))));
    }

    #[tokio::test]
    async fn quit_race_keeps_newer_login() {
        let (registry, mut rx) = make_registry();
        let _ = registry.player_login(profile("p", "A")).await;
        let _ = registry.player_login(profile("p", "B")).await;
        let _ = next_json(&mut rx);
        let _ = next_json(&mut rx);

        let Ok(outcome) = registry.player_quit(profile("p", "A")).await else {
            panic!("quit failed");
        };
        assert_eq!(outcome, SyncOutcome::QuitSuperseded);
        // A superseded quit is not announced.
        assert!(rx.try_recv().is_err());

        let Ok(Some(row)) = registry.get_player("p").await else {
            panic!("row expected");
        };
        assert_eq!(row.current_server, "B");
    }

    #[tokio::test]
    async fn normal_quit_clears_and_publishes_remove() {
        let (registry, mut rx) = make_registry();
        let _ = registry.player_login(profile("p", "A")).await;
        let (channel, login) = next_json(&mut rx);
        assert_eq!(channel, Channel::Players);
        assert_eq!(login["type"], "SYNC");

        let Ok(outcome) = registry.player_quit(profile("p", "A")).await else {
            panic!("quit failed");
        };
        assert_eq!(outcome, SyncOutcome::QuitAccepted);
        let (_, quit) = next_json(&mut rx);
        assert_eq!(quit["type"], "REMOVE");
        assert_eq!(quit["entry"]["current_server"], "");

        let Ok(Some(row)) = registry.get_player("p").await else {
            panic!("row expected");
        };
        assert_eq!(row.current_server, "");
        let Ok(online) = registry.fetch_all_players().await else {
            panic!("fetch failed");
        };
        assert!(online.is_empty());
    }

    #[tokio::test]
    async fn update_all_players_advertises_then_stores() {
        let (registry, mut rx) = make_registry();
        assert!(matches!(registry.update_all_players(Vec::new()).await, Ok(0)));
        assert!(rx.try_recv().is_err());

        let roster = vec![profile("a", "lobby"), profile("b", "survival")];
        assert!(matches!(registry.update_all_players(roster).await, Ok(2)));
        let (_, json) = next_json(&mut rx);
        assert_eq!(json["type"], "ADVERTISE_ALL");
        assert_eq!(json["entry"][1]["uuid"], "b");

        let Ok(online) = registry.fetch_all_players().await else {
            panic!("fetch failed");
        };
        assert_eq!(online.len(), 2);
    }

    #[tokio::test]
    async fn bungee_changes_publish_sync() {
        let (registry, mut rx) = make_registry();
        let Ok(config) = registry.set_motd("Welcome").await else {
            panic!("set motd failed");
        };
        assert_eq!(config.motd, "Welcome");
        let (channel, json) = next_json(&mut rx);
        assert_eq!(channel, Channel::Bungee);
        assert_eq!(json["entry"]["motd"], "Welcome");

        let _ = registry.set_favicon("data:image/png;base64,AA").await;
        let Ok(current) = registry.get_bungee_config().await else {
            panic!("get failed");
        };
        assert_eq!(current.motd, "Welcome");
        assert_eq!(current.favicon, "data:image/png;base64,AA");
    }

    #[tokio::test]
    async fn command_reaches_only_targeted_streams() {
        let (registry, _rx) = make_registry();
        let Ok(mut p1) = registry.subscribe("proxy-1") else {
            panic!("subscribe failed");
        };
        let Ok(mut p2) = registry.subscribe("proxy-2") else {
            panic!("subscribe failed");
        };

        assert!(registry.send_bungee_command("alert hi", Some("proxy-1")).await.is_ok());
        assert!(registry.send_bungee_command("  ", None).await.is_err());
        let _ = registry.set_motd("m").await;

        let Some(first) = p1.recv().await else {
            panic!("command expected");
        };
        assert_eq!(first.kind, EventKind::Command);
        assert_eq!(first.command.as_deref(), Some("alert hi"));

        let Some(other) = p2.recv().await else {
            panic!("sync expected");
        };
        assert_eq!(other.kind, EventKind::Sync);
    }

    #[tokio::test]
    async fn quit_stream_closes_target() {
        let (registry, mut rx) = make_registry();
        let Ok(mut p1) = registry.subscribe("proxy-1") else {
            panic!("subscribe failed");
        };
        let Ok(_p2) = registry.subscribe("proxy-2") else {
            panic!("subscribe failed");
        };

        assert!(matches!(
            registry.quit_stream(Some("proxy-1".to_string())).await,
            Ok(1)
        ));
        assert_eq!(p1.recv().await, None);
        assert_eq!(registry.event_bus().subscriber_count(), 1);
        assert!(rx.try_recv().is_err());
        assert!(registry.subscribe("").is_err());
    }
}
