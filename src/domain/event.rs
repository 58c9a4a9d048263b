//! Registry change envelopes.
//!
//! Every registry mutation produces an [`Envelope`] that travels through
//! the [`super::EventBus`]: onto its named pub/sub [`Channel`] and to the
//! streaming subscribers whose name matches the envelope's target.
//! Envelopes are never persisted.

use serde::Serialize;

use super::{BungeeConfig, PlayerProfile, ServerEntry};

/// Envelope type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Entry created or changed; consumers replace their copy.
    Sync,
    /// Entry removed (servers) or player left (players).
    Remove,
    /// Proxy command to execute.
    Command,
    /// Full player roster.
    AdvertiseAll,
    /// Stream control: close the matching subscriptions.
    Quit,
}

/// Named pub/sub channel, one per concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Server entry changes.
    Servers,
    /// Proxy configuration and commands.
    Bungee,
    /// Player session changes.
    Players,
}

impl Channel {
    /// Wire name of the channel.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Servers => "nebula.servers.global",
            Self::Bungee => "nebula.bungee.global",
            Self::Players => "nebula.player.global",
        }
    }
}

/// Payload carried by an envelope; the shape is fixed per channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventEntry {
    /// A server entry.
    Server(Box<ServerEntry>),
    /// The proxy configuration.
    Bungee(BungeeConfig),
    /// One player.
    Player(PlayerProfile),
    /// The whole online roster.
    Players(Vec<PlayerProfile>),
}

/// One registry change notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Subscriber name prefix this envelope is meant for; `None` broadcasts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// The affected record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EventEntry>,
    /// Proxy command text for [`EventKind::Command`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip)]
    channel: Option<Channel>,
}

impl Envelope {
    fn on(channel: Channel, kind: EventKind, entry: Option<EventEntry>) -> Self {
        Self {
            kind,
            target: None,
            entry,
            command: None,
            channel: Some(channel),
        }
    }

    /// Server created or changed.
    #[must_use]
    pub fn server_sync(entry: ServerEntry) -> Self {
        Self::on(
            Channel::Servers,
            EventKind::Sync,
            Some(EventEntry::Server(Box::new(entry))),
        )
    }

    /// Server removed.
    #[must_use]
    pub fn server_remove(entry: ServerEntry) -> Self {
        Self::on(
            Channel::Servers,
            EventKind::Remove,
            Some(EventEntry::Server(Box::new(entry))),
        )
    }

    /// Proxy configuration changed.
    #[must_use]
    pub fn bungee_sync(config: BungeeConfig) -> Self {
        Self::on(
            Channel::Bungee,
            EventKind::Sync,
            Some(EventEntry::Bungee(config)),
        )
    }

    /// Command for the proxies to execute.
    #[must_use]
    pub fn bungee_command(command: impl Into<String>) -> Self {
        let mut envelope = Self::on(Channel::Bungee, EventKind::Command, None);
        envelope.command = Some(command.into());
        envelope
    }

    /// Player logged in or switched servers.
    #[must_use]
    pub fn player_login(profile: PlayerProfile) -> Self {
        Self::on(
            Channel::Players,
            EventKind::Sync,
            Some(EventEntry::Player(profile)),
        )
    }

    /// Player quit (accepted quits only).
    #[must_use]
    pub fn player_quit(profile: PlayerProfile) -> Self {
        Self::on(
            Channel::Players,
            EventKind::Remove,
            Some(EventEntry::Player(profile)),
        )
    }

    /// Full roster advertisement.
    #[must_use]
    pub fn players_advertise(profiles: Vec<PlayerProfile>) -> Self {
        Self::on(
            Channel::Players,
            EventKind::AdvertiseAll,
            Some(EventEntry::Players(profiles)),
        )
    }

    /// Stream close request, broadcast when `target` is `None` or empty.
    #[must_use]
    pub fn quit(target: Option<String>) -> Self {
        Self {
            kind: EventKind::Quit,
            target: target.filter(|t| !t.is_empty()),
            entry: None,
            command: None,
            channel: None,
        }
    }

    /// Restricts delivery to subscribers whose name starts with `target`.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        self.target = (!target.is_empty()).then_some(target);
        self
    }

    /// Channel this envelope is published on; `None` for stream control.
    #[must_use]
    pub const fn channel(&self) -> Option<Channel> {
        self.channel
    }

    /// Returns `true` if a subscriber called `subscriber` should receive it.
    #[must_use]
    pub fn is_for(&self, subscriber: &str) -> bool {
        self.target
            .as_deref()
            .is_none_or(|target| subscriber.starts_with(target))
    }
}
