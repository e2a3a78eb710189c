//! Handshake decoding and the login rewrite.

use std::io;
use std::net::IpAddr;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use crate::protocol::frame::{
    decode_port, decode_protocol_version, encode_varint, varint_len, DECLARED_LEN_OFFSET,
    HANDSHAKE_PACKET_ID, HEADER_LEN, HEADER_OVERHEAD, LEGACY_PING, LOGIN_FIXED_LEN,
    MAX_PAYLOAD_LEN, MAX_VERSION_HIGH_BYTE, MIN_PAYLOAD_LEN, MIN_PROTOCOL_VERSION,
    PACKET_ID_OFFSET, TRAILER_LEN, VERSION_HI_OFFSET, VERSION_LO_OFFSET,
};
use crate::protocol::status::STATUS_REQUEST;

/// Reasons a handshake is refused. None of them is ever reported to the client.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("legacy server list ping")]
    LegacyPing,

    #[error("unexpected packet id {0:#04x}")]
    PacketId(u8),

    #[error("protocol version byte {0} below minimum")]
    ProtocolVersion(u8),

    #[error("version high byte {0} out of range")]
    VersionHighByte(u8),

    #[error("declared length {0} out of range")]
    DeclaredLength(u8),

    #[error("unknown next state {0}")]
    NextState(u8),

    #[error("requested port is zero")]
    ZeroPort,

    #[error("missing status request marker")]
    StatusMarker,

    #[error("truncated frame: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::LegacyPing => "legacy_ping",
            DecodeError::PacketId(_) => "packet_id",
            DecodeError::ProtocolVersion(_) => "protocol_version",
            DecodeError::VersionHighByte(_) => "version_high_byte",
            DecodeError::DeclaredLength(_) => "declared_length",
            DecodeError::NextState(_) => "next_state",
            DecodeError::ZeroPort => "zero_port",
            DecodeError::StatusMarker => "status_marker",
            DecodeError::Io(_) => "truncated",
        }
    }
}

/// What the client wants after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status,
    Login,
}

impl NextState {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(NextState::Status),
            2 => Some(NextState::Login),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            NextState::Status => 1,
            NextState::Login => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NextState::Status => "status",
            NextState::Login => "login",
        }
    }
}

/// A decoded handshake, together with the bytes it was decoded from.
#[derive(Debug, Clone)]
pub struct Handshake {
    header: [u8; HEADER_LEN],
    payload: Vec<u8>,
    protocol_version: u32,
    requested_host: String,
    requested_port: u16,
    next_state: NextState,
}

/// Validate the fixed header and return the payload length it announces.
pub fn check_header(header: &[u8; HEADER_LEN]) -> Result<usize, DecodeError> {
    let declared = header[DECLARED_LEN_OFFSET];
    if declared == LEGACY_PING {
        return Err(DecodeError::LegacyPing);
    }
    if header[PACKET_ID_OFFSET] != HANDSHAKE_PACKET_ID {
        return Err(DecodeError::PacketId(header[PACKET_ID_OFFSET]));
    }
    if header[VERSION_LO_OFFSET] < MIN_PROTOCOL_VERSION {
        return Err(DecodeError::ProtocolVersion(header[VERSION_LO_OFFSET]));
    }
    if header[VERSION_HI_OFFSET] > MAX_VERSION_HIGH_BYTE {
        return Err(DecodeError::VersionHighByte(header[VERSION_HI_OFFSET]));
    }

    match usize::from(declared).checked_sub(HEADER_OVERHEAD) {
        Some(len) if (MIN_PAYLOAD_LEN..=MAX_PAYLOAD_LEN).contains(&len) => Ok(len),
        _ => Err(DecodeError::DeclaredLength(declared)),
    }
}

impl Handshake {
    /// Decode a header and the payload it announced.
    pub fn parse(header: [u8; HEADER_LEN], payload: Vec<u8>) -> Result<Self, DecodeError> {
        let expected = check_header(&header)?;
        if payload.len() != expected {
            return Err(DecodeError::DeclaredLength(header[DECLARED_LEN_OFFSET]));
        }

        let host_end = payload.len() - TRAILER_LEN;
        let state_byte = payload[payload.len() - 1];
        let next_state = NextState::from_byte(state_byte).ok_or(DecodeError::NextState(state_byte))?;

        let requested_port = decode_port(payload[host_end], payload[host_end + 1]);
        if requested_port == 0 {
            return Err(DecodeError::ZeroPort);
        }

        Ok(Self {
            protocol_version: decode_protocol_version(
                header[VERSION_LO_OFFSET],
                header[VERSION_HI_OFFSET],
            ),
            requested_host: String::from_utf8_lossy(&payload[..host_end]).into_owned(),
            requested_port,
            next_state,
            header,
            payload,
        })
    }

    /// Byte 0 of the header: length of everything after it.
    pub fn declared_length(&self) -> u8 {
        self.header[DECLARED_LEN_OFFSET]
    }

    /// Protocol version decoded from header bytes 2 and 3.
    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// Virtual host the client asked for.
    pub fn requested_host(&self) -> &str {
        &self.requested_host
    }

    /// Port from the trailer, see [`decode_port`].
    pub fn requested_port(&self) -> u16 {
        self.requested_port
    }

    /// Whether the client wants status or login.
    pub fn next_state(&self) -> NextState {
        self.next_state
    }

    /// The header exactly as received.
    pub fn header(&self) -> &[u8; HEADER_LEN] {
        &self.header
    }

    /// The payload exactly as received.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn host_bytes(&self) -> &[u8] {
        &self.payload[..self.payload.len() - TRAILER_LEN]
    }

    fn port_bytes(&self) -> [u8; 2] {
        let at = self.payload.len() - TRAILER_LEN;
        [self.payload[at], self.payload[at + 1]]
    }

    /// Host field carrying the client's address for the backend:
    /// `host NUL client-ip NUL nil-uuid`.
    ///
    /// IPv4-mapped IPv6 addresses (dual-stack listeners) are written as plain IPv4.
    pub fn forwarded_host(&self, client_ip: IpAddr) -> Vec<u8> {
        let ip = client_ip.to_canonical().to_string();
        let uuid = Uuid::nil().hyphenated().to_string();

        let mut host = Vec::with_capacity(self.host_bytes().len() + ip.len() + uuid.len() + 2);
        host.extend_from_slice(self.host_bytes());
        host.push(0);
        host.extend_from_slice(ip.as_bytes());
        host.push(0);
        host.extend_from_slice(uuid.as_bytes());
        host
    }

    /// The complete login handshake to send to the backend.
    ///
    /// Version bytes, port bytes and state are copied from the client; both
    /// length fields are recomputed for the forwarded host field.
    pub fn login_frame(&self, client_ip: IpAddr) -> Vec<u8> {
        let host = self.forwarded_host(client_ip);
        let host_len = host.len() as u32;
        let declared = (LOGIN_FIXED_LEN - 1 + varint_len(host_len) + host.len()) as u32;

        let mut frame = Vec::with_capacity(declared as usize + varint_len(declared));
        encode_varint(declared, &mut frame);
        frame.push(HANDSHAKE_PACKET_ID);
        frame.push(self.header[VERSION_LO_OFFSET]);
        frame.push(self.header[VERSION_HI_OFFSET]);
        encode_varint(host_len, &mut frame);
        frame.extend_from_slice(&host);
        frame.extend_from_slice(&self.port_bytes());
        frame.push(NextState::Login.as_byte());
        frame
    }
}

/// Read and validate a handshake from a fresh client connection.
///
/// For status requests the two-byte request marker that follows the
/// handshake is consumed and checked too.
pub async fn read_handshake<R>(reader: &mut R) -> Result<Handshake, DecodeError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let payload_len = check_header(&header)?;

    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload).await?;
    let handshake = Handshake::parse(header, payload)?;

    if handshake.next_state() == NextState::Status {
        let mut marker = [0u8; 2];
        reader.read_exact(&mut marker).await?;
        if marker != STATUS_REQUEST {
            return Err(DecodeError::StatusMarker);
        }
    }

    Ok(handshake)
}
