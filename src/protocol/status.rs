//! Status exchange framing.
//!
//! ```text
//! proxy  → backend : handshake (verbatim) + STATUS_REQUEST
//! backend → proxy  : length prefix + status body (JSON)
//! client → proxy   : 10-byte ping, first two bytes PING_TAG
//! proxy  → client  : PONG
//! ```

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::frame::{read_length_prefix, LengthPrefix};

/// Status request packet: length 1, packet id 0.
pub const STATUS_REQUEST: [u8; 2] = [0x01, 0x00];

/// Size of the ping frame a client sends after reading the status.
pub const PING_FRAME_LEN: usize = 10;

/// Leading bytes of a valid ping frame: length 9, packet id 1.
pub const PING_TAG: [u8; 2] = [0x09, 0x01];

/// Fixed reply to a ping.
pub const PONG: [u8; PING_FRAME_LEN] = [0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];

/// A status response as read from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// The length prefix bytes exactly as the backend encoded them.
    pub prefix: Vec<u8>,
    /// The response body.
    pub body: Vec<u8>,
}

impl StatusResponse {
    /// Prefix and body as a single buffer, ready to forward.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.prefix.len() + self.body.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(&self.body);
        out
    }
}

/// Read one length-prefixed status response.
///
/// Returns `Ok(None)` if the prefix is malformed.
pub async fn read_status_response<R>(reader: &mut R) -> std::io::Result<Option<StatusResponse>>
where
    R: AsyncRead + Unpin,
{
    let Some(LengthPrefix { value, raw }) = read_length_prefix(reader).await? else {
        return Ok(None);
    };

    let mut body = vec![0u8; value];
    reader.read_exact(&mut body).await?;
    Ok(Some(StatusResponse { prefix: raw, body }))
}

pub fn is_ping(frame: &[u8; PING_FRAME_LEN]) -> bool {
    frame[..2] == PING_TAG
}
