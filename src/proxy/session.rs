//! Session ownership and backend dialing.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;

use crate::net::ConnectionId;
use crate::protocol::DecodeError;
use crate::resilience::{within, Stage, TimeoutError};
use crate::routing::Route;

/// Why a session ended early. Only `Dial` is ever logged.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("handshake rejected: {0}")]
    Handshake(#[from] DecodeError),

    #[error("backend {route:?} at {addr} unreachable: {source}")]
    Dial {
        route: String,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("client sent an unexpected ping frame")]
    BadPing,

    #[error("backend sent a malformed status response")]
    MalformedStatus,

    #[error("relay I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SessionError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Handshake(_) => "handshake",
            SessionError::Dial { .. } => "dial",
            SessionError::Timeout(_) => "timeout",
            SessionError::BadPing => "bad_ping",
            SessionError::MalformedStatus => "malformed_status",
            SessionError::Io(_) => "io",
        }
    }
}

/// One client socket paired with one backend socket.
///
/// The session owns both streams; dropping it closes both.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    client: TcpStream,
    backend: TcpStream,
}

impl Session {
    pub fn new(id: ConnectionId, peer: SocketAddr, client: TcpStream, backend: TcpStream) -> Self {
        Self {
            id,
            peer,
            client,
            backend,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The client's address as seen on the inbound socket.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Give up the pairing: `(client, backend)`.
    pub fn into_streams(self) -> (TcpStream, TcpStream) {
        (self.client, self.backend)
    }
}

/// Connect to a route's backend within `limit`.
pub async fn dial(route: &Route, limit: Duration) -> Result<TcpStream, SessionError> {
    let addr = route.backend();
    let connected = match within(Stage::Dial, limit, TcpStream::connect(addr)).await {
        Ok(result) => result,
        Err(timeout) => Err(timeout.into()),
    };

    let stream = connected.map_err(|source| SessionError::Dial {
        route: route.name().to_string(),
        addr,
        source,
    })?;
    let _ = stream.set_nodelay(true);
    Ok(stream)
}
