//! Server list ping protocol: varints, packet framing and the TCP probe.
//!
//! Pure protocol logic with no state kept across calls. The health
//! scheduler consumes it through the [`Prober`] trait.

pub mod packet;
pub mod probe;
pub mod varint;

pub use packet::{PacketError, decode_packet, encode_packet};
pub use probe::{ProbeError, Prober, SlpProber, status_or_offline};
pub use varint::{VarintError, decode_varint, encode_varint};
