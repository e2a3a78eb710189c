//! Handshake frame layout.
//!
//! The proxy only accepts handshakes that fit a fixed, single-byte-length
//! shape:
//!
//! ```text
//! offset  size  field
//! 0       1     declared length     (bytes after this one; 0xFE = legacy ping)
//! 1       1     packet id           (must be 0, "handshake")
//! 2       1     protocol version lo (>= 127)
//! 3       1     protocol version hi (<= 100, coarse sanity bound)
//! 4       1     host length
//! 5       n     payload: host bytes | port hi | port lo | next state
//! ```
//!
//! The payload length is `declared length - 4` and must fall in `6..=70`.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the fixed header.
pub const HEADER_LEN: usize = 5;

pub const DECLARED_LEN_OFFSET: usize = 0;
pub const PACKET_ID_OFFSET: usize = 1;
pub const VERSION_LO_OFFSET: usize = 2;
pub const VERSION_HI_OFFSET: usize = 3;
pub const HOST_LEN_OFFSET: usize = 4;

/// First byte of a pre-netty server list ping.
pub const LEGACY_PING: u8 = 0xFE;

/// The only packet id accepted in the first frame.
pub const HANDSHAKE_PACKET_ID: u8 = 0x00;

/// Lowest accepted value of the version low byte.
pub const MIN_PROTOCOL_VERSION: u8 = 127;

/// Highest accepted value of the version high byte.
pub const MAX_VERSION_HIGH_BYTE: u8 = 100;

/// Header bytes counted by the declared length but not part of the payload
/// (packet id, two version bytes, host length).
pub const HEADER_OVERHEAD: usize = 4;

/// Shortest payload: a 3-byte host plus the trailer.
pub const MIN_PAYLOAD_LEN: usize = 6;

/// Longest payload accepted.
pub const MAX_PAYLOAD_LEN: usize = 70;

/// Port (2 bytes) and next state (1 byte) at the end of the payload.
pub const TRAILER_LEN: usize = 3;

/// Declared length of a login frame minus its host field, when the host
/// length fits a single byte: packet id + version (2) + host length + trailer.
pub const LOGIN_FIXED_LEN: usize = 7;

/// Widest length prefix read from a backend (the protocol caps packets at 2^21 - 1).
pub const MAX_VARINT_LEN: usize = 3;

/// Combine the two port bytes of the trailer.
///
/// The high byte is shifted by 4 bits, not 8. Only the routing key depends
/// on it; the raw bytes are always forwarded untouched.
pub fn decode_port(hi: u8, lo: u8) -> u16 {
    (u16::from(hi) << 4) | u16::from(lo)
}

/// Decode the protocol version from the two version bytes.
///
/// Byte 2 carries a continuation bit when the version does not fit in 7 bits.
pub fn decode_protocol_version(lo: u8, hi: u8) -> u32 {
    if lo & 0x80 != 0 {
        u32::from(lo & 0x7F) | (u32::from(hi) << 7)
    } else {
        u32::from(lo)
    }
}

/// Append `value` as a 7-bit-continuation integer.
pub fn encode_varint(mut value: u32, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Number of bytes `encode_varint` produces for `value`.
pub fn varint_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}

/// A length prefix read from the wire, with the exact bytes it was encoded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthPrefix {
    pub value: usize,
    pub raw: Vec<u8>,
}

/// Read a length prefix of at most [`MAX_VARINT_LEN`] bytes.
///
/// Returns `Ok(None)` when the prefix is wider than that.
pub async fn read_length_prefix<R>(reader: &mut R) -> std::io::Result<Option<LengthPrefix>>
where
    R: AsyncRead + Unpin,
{
    let mut raw = Vec::with_capacity(MAX_VARINT_LEN);
    let mut value = 0usize;
    for shift in (0..MAX_VARINT_LEN).map(|i| i * 7) {
        let byte = reader.read_u8().await?;
        raw.push(byte);
        value |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(Some(LengthPrefix { value, raw }));
        }
    }
    Ok(None)
}
