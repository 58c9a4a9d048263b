//! Service layer: registry logic, session resolution, health checking and
//! the IP reputation client.
//!
//! [`Registry`] enforces the registry invariants over the storage
//! capabilities and publishes every change through the
//! [`crate::domain::EventBus`]. [`HealthScheduler`] keeps server statuses
//! fresh in the background.

pub mod health;
pub mod ip_lookup;
pub mod player_session;
pub mod registry;

pub use health::{CycleReport, HealthConfig, HealthScheduler};
pub use ip_lookup::{IpReputationClient, IpVerdict};
pub use player_session::{PlayerSessionResolver, Resolution};
pub use registry::Registry;
