//! Domain layer: registry records, change envelopes and the event bus.
//!
//! Records ([`ServerEntry`], [`BungeeConfig`], [`PlayerProfile`]) are plain
//! data shared by storage, the REST layer and the envelopes. The
//! [`EventBus`] carries every change to the pub/sub channels and to the
//! streaming subscribers.

pub mod bungee;
pub mod event;
pub mod event_bus;
pub mod player;
pub mod publisher;
pub mod server_entry;
pub mod subscriber_id;

pub use bungee::BungeeConfig;
pub use event::{Channel, Envelope, EventEntry, EventKind};
pub use event_bus::{EventBus, Subscription};
pub use player::{PlayerProfile, PlayerProperty, SessionAction, SyncOutcome};
pub use publisher::{ChannelMessage, ChannelPublisher, LocalPublisher, RedisPublisher};
pub use server_entry::{
    DEFAULT_LOCKDOWN_DESCRIPTION, Lockdown, PingStatus, PlayersInfo, PushOutcome, ServerEntry,
    ServerUpdate, VersionInfo,
};
pub use subscriber_id::SubscriberId;
