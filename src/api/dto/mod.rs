//! Data Transfer Objects for REST request/response serialization.
//!
//! Registry records ([`crate::domain::ServerEntry`],
//! [`crate::domain::PlayerProfile`], [`crate::domain::BungeeConfig`]) are
//! returned as-is; the types here cover request bodies and list wrappers.

pub mod bungee_dto;
pub mod player_dto;
pub mod server_dto;
pub mod stream_dto;

pub use bungee_dto::*;
pub use player_dto::*;
pub use server_dto::*;
pub use stream_dto::*;
