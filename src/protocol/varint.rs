//! Variable-length integer encoding used by the status ping protocol.
//!
//! Seven payload bits per byte, least significant group first, with bit
//! 7 set on every byte except the last. Values up to 64 bits encode in
//! at most [`MAX_VARINT_LEN`] bytes.
//!
//! ```text
//! 300 = 0b1_0010_1100
//!   byte 0: 0b1_0101100 = 0xAC  (low 7 bits, continuation)
//!   byte 1: 0b0_0000010 = 0x02  (next 7 bits, last byte)
//! ```

use tokio::io::{AsyncRead, AsyncReadExt};

/// Maximum number of bytes a `u64` varint can occupy.
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION_BIT: u8 = 0x80;
const DATA_MASK: u8 = 0x7F;

/// Error returned when varint decoding fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VarintError {
    /// Input ended before a terminating byte was seen.
    #[error("unexpected end of input while reading varint")]
    UnexpectedEof,
    /// More than [`MAX_VARINT_LEN`] bytes, or bits beyond 64.
    #[error("varint overflows u64")]
    Overflow,
}

/// Appends the varint encoding of `value` to `buf`.
///
/// Returns the number of bytes written. The encoding is always minimal.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) -> usize {
    let mut written = 0;
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let byte = (value & u64::from(DATA_MASK)) as u8;
        value >>= 7;
        written += 1;
        if value == 0 {
            buf.push(byte);
            return written;
        }
        buf.push(byte | CONTINUATION_BIT);
    }
}

/// Number of bytes [`encode_varint`] produces for `value`.
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decodes one varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
///
/// [`VarintError::UnexpectedEof`] when `buf` ends mid-varint,
/// [`VarintError::Overflow`] when the encoding exceeds 64 bits.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut acc = Accumulator::default();
    for &byte in buf {
        if let Some(value) = acc.push(byte)? {
            return Ok((value, acc.consumed));
        }
    }
    Err(VarintError::UnexpectedEof)
}

/// Reads one varint from an async byte source, one byte at a time.
///
/// # Errors
///
/// [`VarintError::UnexpectedEof`] if the source closes mid-varint (or
/// fails), [`VarintError::Overflow`] on an over-long encoding.
pub async fn read_varint<R>(reader: &mut R) -> Result<u64, VarintError>
where
    R: AsyncRead + Unpin,
{
    let mut acc = Accumulator::default();
    loop {
        let byte = reader
            .read_u8()
            .await
            .map_err(|_| VarintError::UnexpectedEof)?;
        if let Some(value) = acc.push(byte)? {
            return Ok(value);
        }
    }
}

#[derive(Default)]
struct Accumulator {
    value: u64,
    shift: u32,
    consumed: usize,
}

impl Accumulator {
    fn push(&mut self, byte: u8) -> Result<Option<u64>, VarintError> {
        if self.consumed >= MAX_VARINT_LEN {
            return Err(VarintError::Overflow);
        }
        let data = u64::from(byte & DATA_MASK);
        // 10th byte may only carry the single remaining bit.
        if self.shift == 63 && data > 1 {
            return Err(VarintError::Overflow);
        }
        self.value |= data << self.shift;
        self.consumed += 1;
        if byte & CONTINUATION_BIT == 0 {
            return Ok(Some(self.value));
        }
        self.shift += 7;
        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn encoded(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        buf
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(1), vec![0x01]);
        assert_eq!(encoded(127), vec![0x7F]);
        assert_eq!(encoded(128), vec![0x80, 0x01]);
        assert_eq!(encoded(300), vec![0xAC, 0x02]);
        assert_eq!(encoded(25_565), vec![0xDD, 0xC7, 0x01]);
    }

    #[test]
    fn round_trip_is_minimal_at_group_boundaries() {
        for shift in 0..64u32 {
            for value in [1u64 << shift, (1u64 << shift) - 1, (1u64 << shift) + 1] {
                let buf = encoded(value);
                assert_eq!(buf.len(), varint_len(value), "length of {value}");
                let Ok((decoded, used)) = decode_varint(&buf) else {
                    panic!("decode failed for {value}");
                };
                assert_eq!(decoded, value);
                assert_eq!(used, buf.len());
            }
        }
        let max = encoded(u64::MAX);
        assert_eq!(max.len(), MAX_VARINT_LEN);
        assert_eq!(decode_varint(&max), Ok((u64::MAX, MAX_VARINT_LEN)));
    }

    #[test]
    fn decode_stops_at_terminator() {
        let buf = [0xAC, 0x02, 0xFF, 0xFF];
        assert_eq!(decode_varint(&buf), Ok((300, 2)));
    }

    #[test]
    fn truncated_input_is_eof() {
        assert_eq!(decode_varint(&[]), Err(VarintError::UnexpectedEof));
        assert_eq!(decode_varint(&[0x80, 0x80]), Err(VarintError::UnexpectedEof));
    }

    #[test]
    fn overlong_input_overflows() {
        let eleven = [0x80u8; 11];
        assert_eq!(decode_varint(&eleven), Err(VarintError::Overflow));

        let mut too_wide = vec![0xFFu8; 9];
        too_wide.push(0x02);
        assert_eq!(decode_varint(&too_wide), Err(VarintError::Overflow));
    }

    #[tokio::test]
    async fn read_varint_from_async_source() {
        let bytes: &[u8] = &[0xDD, 0xC7, 0x01, 0x05];
        let mut reader = bytes;
        assert_eq!(read_varint(&mut reader).await, Ok(25_565));
        assert_eq!(read_varint(&mut reader).await, Ok(5));
        assert_eq!(
            read_varint(&mut reader).await,
            Err(VarintError::UnexpectedEof)
        );
    }
}
