//! Packet framing and the handshake / status-request / pong payloads.
//!
//! Every packet on the wire is `varint(len(payload)) || payload`. The
//! status exchange uses three packets:
//!
//! ```text
//! handshake = 0x00 || varint(protocol) || varint(len(host)) || host || u16be(port) || 0x01
//! request   = 0x00
//! pong      = varint(packet_id) || varint(len(json)) || json
//! ```

use serde::Deserialize;

use super::varint::{VarintError, decode_varint, encode_varint, varint_len};
use crate::domain::{PingStatus, PlayersInfo, VersionInfo};

/// Packet id shared by the handshake, status request and status response.
pub const STATUS_PACKET_ID: u8 = 0x00;

/// Handshake `next_state` value selecting the status flow.
pub const NEXT_STATE_STATUS: u8 = 0x01;

/// Largest pong frame accepted, in bytes.
pub const MAX_PACKET_LEN: u64 = 2 * 1024 * 1024;

/// Reasons a frame or pong payload cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// A length prefix, packet id or string length was malformed.
    #[error("malformed varint: {0}")]
    Varint(#[from] VarintError),
    /// Fewer bytes than a length prefix announced.
    #[error("short packet: expected {expected} bytes, got {actual}")]
    Short {
        /// Bytes announced by the prefix.
        expected: u64,
        /// Bytes actually available.
        actual: usize,
    },
    /// Frame length above [`MAX_PACKET_LEN`].
    #[error("packet of {0} bytes exceeds limit")]
    TooLarge(u64),
    /// The status JSON did not decode.
    #[error("invalid status json: {0}")]
    Json(String),
}

/// Prefixes `payload` with its varint length.
#[must_use]
pub fn encode_packet(payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u64;
    let mut out = Vec::with_capacity(varint_len(len) + payload.len());
    encode_varint(len, &mut out);
    out.extend_from_slice(payload);
    out
}

/// Splits one framed packet off the front of `buf`.
///
/// Returns the payload and the total number of bytes consumed.
///
/// # Errors
///
/// Returns a [`PacketError`] when the prefix is malformed or the buffer
/// holds fewer bytes than announced.
pub fn decode_packet(buf: &[u8]) -> Result<(&[u8], usize), PacketError> {
    let (len, prefix) = decode_varint(buf)?;
    let rest = buf.get(prefix..).unwrap_or_default();
    let payload = take(rest, len)?;
    Ok((payload, prefix + payload.len()))
}

/// Builds the handshake payload announcing `host:port` and the status state.
#[must_use]
pub fn handshake_payload(protocol_version: u64, host: &str, port: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(host.len() + 16);
    payload.push(STATUS_PACKET_ID);
    encode_varint(protocol_version, &mut payload);
    encode_varint(host.len() as u64, &mut payload);
    payload.extend_from_slice(host.as_bytes());
    payload.extend_from_slice(&port.to_be_bytes());
    payload.push(NEXT_STATE_STATUS);
    payload
}

/// Builds the (empty) status-request payload.
#[must_use]
pub fn status_request_payload() -> Vec<u8> {
    vec![STATUS_PACKET_ID]
}

/// Parses a pong payload (frame already stripped) into an online status.
///
/// # Errors
///
/// Returns a [`PacketError`] on malformed varints, a short JSON string or
/// a JSON document that does not match the status shape.
pub fn parse_pong(payload: &[u8]) -> Result<PingStatus, PacketError> {
    let (_packet_id, id_len) = decode_varint(payload)?;
    let rest = payload.get(id_len..).unwrap_or_default();
    let (json_len, len_len) = decode_varint(rest)?;
    let rest = rest.get(len_len..).unwrap_or_default();
    let json = take(rest, json_len)?;

    let response: StatusResponse =
        serde_json::from_slice(json).map_err(|e| PacketError::Json(e.to_string()))?;
    Ok(response.into_status())
}

fn take(buf: &[u8], len: u64) -> Result<&[u8], PacketError> {
    usize::try_from(len)
        .ok()
        .and_then(|n| buf.get(..n))
        .ok_or(PacketError::Short {
            expected: len,
            actual: buf.len(),
        })
}

/// Status JSON as sent by the server. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatusResponse {
    version: VersionInfo,
    players: PlayersInfo,
    description: serde_json::Value,
    favicon: String,
}

impl StatusResponse {
    fn into_status(self) -> PingStatus {
        let mut description = String::new();
        flatten_chat(&self.description, &mut description);
        PingStatus {
            online: true,
            version: self.version,
            players: self.players,
            description,
            favicon: self.favicon,
        }
    }
}

/// Flattens a chat component (plain string, `{"text", "extra"}` object or
/// array of components) into its visible text.
fn flatten_chat(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::String(s) => out.push_str(s),
        serde_json::Value::Array(parts) => {
            for part in parts {
                flatten_chat(part, out);
            }
        }
        serde_json::Value::Object(map) => {
            if let Some(text) = map.get("text") {
                flatten_chat(text, out);
            }
            if let Some(extra) = map.get("extra") {
                flatten_chat(extra, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn pong_payload(json: &str) -> Vec<u8> {
        let mut payload = Vec::new();
        encode_varint(0, &mut payload);
        encode_varint(json.len() as u64, &mut payload);
        payload.extend_from_slice(json.as_bytes());
        payload
    }

    #[test]
    fn framing_round_trip() {
        let small = (0..=300usize).map(|len| (0..len).map(|i| (i * 31 % 256) as u8).collect());
        let large: Vec<u8> = (0..20_000usize).map(|i| (i % 251) as u8).collect();
        for payload in small.chain(std::iter::once(large)) {
            let framed = encode_packet(&payload);
            let Ok((decoded, used)) = decode_packet(&framed) else {
                panic!("decode failed for {} bytes", payload.len());
            };
            assert_eq!(decoded, payload.as_slice());
            assert_eq!(used, framed.len());
        }
    }

    #[test]
    fn large_payload_uses_three_byte_prefix() {
        let payload = vec![0x7E; 16_384];
        let framed = encode_packet(&payload);
        assert_eq!(framed.len(), payload.len() + 3);
        assert_eq!(framed.get(..3), Some(&[0x80, 0x80, 0x01][..]));
    }

    #[test]
    fn decode_packet_rejects_short_frame() {
        let mut framed = encode_packet(&[1, 2, 3, 4]);
        framed.truncate(3);
        assert_eq!(
            decode_packet(&framed),
            Err(PacketError::Short {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn handshake_bytes_are_exact() {
        let payload = handshake_payload(0, "mc.local", 25565);
        let mut expected = vec![0x00, 0x00, 0x08];
        expected.extend_from_slice(b"mc.local");
        expected.extend_from_slice(&[0x63, 0xDD, 0x01]);
        assert_eq!(payload, expected);

        let framed = encode_packet(&payload);
        assert_eq!(framed.first(), Some(&(expected.len() as u8)));
    }

    #[test]
    fn handshake_encodes_protocol_as_varint() {
        let payload = handshake_payload(763, "a", 1);
        assert_eq!(payload.get(..3), Some(&[0x00, 0xFB, 0x05][..]));
    }

    #[test]
    fn status_request_is_single_zero_byte() {
        assert_eq!(encode_packet(&status_request_payload()), vec![0x01, 0x00]);
    }

    #[test]
    fn parse_pong_with_plain_description() {
        let json = r#"{"version":{"name":"1.20.1","protocol":763},
            "players":{"max":100,"online":7,"sample":[]},
            "description":"A Lobby","favicon":"data:image/png;base64,AAAA"}"#;
        let Ok(status) = parse_pong(&pong_payload(json)) else {
            panic!("pong should parse");
        };
        assert!(status.online);
        assert_eq!(status.version.name, "1.20.1");
        assert_eq!(status.version.protocol, 763);
        assert_eq!(status.players.max, 100);
        assert_eq!(status.players.online, 7);
        assert_eq!(status.description, "A Lobby");
        assert_eq!(status.favicon, "data:image/png;base64,AAAA");
    }

    #[test]
    fn parse_pong_flattens_chat_component() {
        let json = r#"{"description":{"text":"Hello ","extra":[{"text":"World"},"!"]}}"#;
        let Ok(status) = parse_pong(&pong_payload(json)) else {
            panic!("pong should parse");
        };
        assert_eq!(status.description, "Hello World!");
        assert_eq!(status.players.max, 0);
    }

    #[test]
    fn parse_pong_rejects_bad_json() {
        let result = parse_pong(&pong_payload("{not json"));
        assert!(matches!(result, Err(PacketError::Json(_))));
    }

    #[test]
    fn parse_pong_rejects_truncated_string() {
        let mut payload = pong_payload(r#"{"favicon":""}"#);
        payload.truncate(payload.len() - 2);
        assert!(matches!(parse_pong(&payload), Err(PacketError::Short { .. })));
    }

    #[test]
    fn parse_pong_rejects_malformed_varint() {
        assert_eq!(
            parse_pong(&[0x80]),
            Err(PacketError::Varint(VarintError::UnexpectedEof))
        );
    }
}
