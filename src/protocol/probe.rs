//! Live status probe over TCP.
//!
//! [`SlpProber`] connects to a backend server, performs the handshake and
//! status request, and reads a single pong frame. Every failure mode is
//! classified into a [`ProbeError`]; callers that only care about
//! liveness use [`status_or_offline`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::packet::{
    MAX_PACKET_LEN, PacketError, encode_packet, handshake_payload, parse_pong,
    status_request_payload,
};
use super::varint::read_varint;
use crate::domain::PingStatus;

/// Why a probe did not produce a status.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The TCP connection could not be established.
    #[error("unreachable: {0}")]
    Unreachable(String),
    /// Connected, but the exchange did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// Short read, malformed varint, oversized frame or bad JSON.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<PacketError> for ProbeError {
    fn from(err: PacketError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Something that can query a backend server's live status.
///
/// The health scheduler depends on this trait rather than on the TCP
/// implementation directly.
#[async_trait]
pub trait Prober: Send + Sync + std::fmt::Debug {
    /// Probes `address:port`, bounding both connect and exchange by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] describing why no status was obtained.
    async fn probe(
        &self,
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<PingStatus, ProbeError>;
}

/// Status ping prober speaking the handshake / status-request / pong exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlpProber {
    protocol_version: u64,
}

impl SlpProber {
    /// Creates a prober that announces `protocol_version` in the handshake.
    #[must_use]
    pub const fn new(protocol_version: u64) -> Self {
        Self { protocol_version }
    }
}

#[async_trait]
impl Prober for SlpProber {
    async fn probe(
        &self,
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<PingStatus, ProbeError> {
        let mut stream = tokio::time::timeout(timeout, TcpStream::connect((address, port)))
            .await
            .map_err(|_| ProbeError::Unreachable(format!("connect timed out after {timeout:?}")))?
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

        tokio::time::timeout(
            timeout,
            exchange(&mut stream, self.protocol_version, address, port),
        )
        .await
        .map_err(|_| ProbeError::Timeout(timeout))?
    }
}

async fn exchange(
    stream: &mut TcpStream,
    protocol_version: u64,
    host: &str,
    port: u16,
) -> Result<PingStatus, ProbeError> {
    let mut request = encode_packet(&handshake_payload(protocol_version, host, port));
    request.extend_from_slice(&encode_packet(&status_request_payload()));
    stream
        .write_all(&request)
        .await
        .map_err(|e| ProbeError::Protocol(format!("cannot write request: {e}")))?;

    let len = read_varint(stream).await.map_err(PacketError::from)?;
    if len > MAX_PACKET_LEN {
        return Err(PacketError::TooLarge(len).into());
    }
    let len = usize::try_from(len).map_err(|_| PacketError::TooLarge(len))?;

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .await
        .map_err(|e| ProbeError::Protocol(format!("short read: {e}")))?;

    Ok(parse_pong(&payload)?)
}

/// Probes and folds every failure into the offline status.
pub async fn status_or_offline(
    prober: &dyn Prober,
    address: &str,
    port: u16,
    timeout: Duration,
) -> PingStatus {
    match prober.probe(address, port, timeout).await {
        Ok(status) => status,
        Err(err) => {
            tracing::debug!(address, port, error = %err, "probe failed, treating as offline");
            PingStatus::offline()
        }
    }
}
