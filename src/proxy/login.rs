//! Login relay: rewritten handshake, then a full-duplex byte pipe.
//!
//! ```text
//! handler task:  client ──read──▶ backend     (upstream)
//! spawned task:  backend ──read──▶ client     (downstream)
//! ```
//!
//! Whichever direction finishes first ends the other. Both sockets are
//! dropped before `relay` returns. The idle budget applies to the session as
//! a whole: one quiet direction is fine while the other keeps moving.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::observability::metrics;
use crate::protocol::Handshake;
use crate::proxy::session::{Session, SessionError};
use crate::resilience::{within, IdleClock, Stage, Timeouts};

const RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Send the rewritten handshake and pipe bytes until either side stops.
pub async fn relay(session: Session, handshake: &Handshake, timeouts: &Timeouts) -> Result<(), SessionError> {
    let id = session.id();
    let frame = handshake.login_frame(session.peer().ip());
    let (client, mut backend) = session.into_streams();

    within(Stage::Handshake, timeouts.handshake, backend.write_all(&frame)).await??;

    let (client_rx, client_tx) = client.into_split();
    let (backend_rx, backend_tx) = backend.into_split();

    let clock = Arc::new(IdleClock::new());
    let idle = timeouts.idle;
    let mut downstream = {
        let clock = Arc::clone(&clock);
        tokio::spawn(async move { pump(backend_rx, client_tx, &clock, idle, "downstream").await })
    };
    let upstream = pump(client_rx, backend_tx, &clock, idle, "upstream");

    let outcome = tokio::select! {
        result = upstream => {
            downstream.abort();
            // Wait for the task to release its halves.
            let _ = downstream.await;
            result
        }
        joined = &mut downstream => joined.unwrap_or_else(|e| Err(io::Error::other(e))),
    };

    match &outcome {
        Ok(bytes) => tracing::debug!(connection_id = %id, bytes = *bytes, "Relay ended"),
        Err(e) => tracing::debug!(connection_id = %id, error = %e, "Relay ended"),
    }
    outcome.map(|_| ()).map_err(SessionError::from)
}

/// Copy `reader` into `writer` until EOF, an error, or `idle` of silence
/// across the whole session as tracked by `clock`.
///
/// On EOF the writer is shut down so the far side sees the close.
pub async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    clock: &IdleClock,
    idle: Duration,
    direction: &'static str,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = clock.run(idle, reader.read(&mut buf)).await??;
        if n == 0 {
            let _ = writer.shutdown().await;
            return Ok(total);
        }
        clock.touch();
        clock.run(idle, writer.write_all(&buf[..n])).await??;
        clock.touch();
        total += n as u64;
        metrics::record_relay_bytes(direction, n as u64);
    }
}
