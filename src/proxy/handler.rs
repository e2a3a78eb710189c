//! Per-connection handler.
//!
//! # Responsibilities
//! - Decode the handshake under the handshake deadline
//! - Pick the route and dial its backend
//! - Hand the session to the status or login relay
//!
//! # Design Decisions
//! - Rejected handshakes are closed without a reply and without a log line
//! - A failed dial is the only session failure that is logged
//! - The handler owns both sockets; every return path closes them

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::net::ConnectionId;
use crate::observability::metrics;
use crate::protocol::{read_handshake, NextState};
use crate::proxy::session::{self, Session, SessionError};
use crate::proxy::{login, status};
use crate::resilience::{within, Stage, Timeouts};
use crate::routing::RouteTable;

/// Read-only state shared by every connection.
#[derive(Debug)]
pub struct ProxyContext {
    pub routes: RouteTable,
    pub timeouts: Timeouts,
}

/// Drive one client connection from handshake to teardown.
pub async fn handle_connection(
    mut client: TcpStream,
    peer: SocketAddr,
    id: ConnectionId,
    ctx: &ProxyContext,
) -> Result<(), SessionError> {
    let decoded = within(Stage::Handshake, ctx.timeouts.handshake, read_handshake(&mut client)).await?;
    let handshake = decoded.inspect_err(|e| metrics::record_rejected_handshake(e.reason()))?;

    let route = ctx
        .routes
        .select(handshake.requested_host(), handshake.requested_port());
    let state = handshake.next_state();

    if state == NextState::Login {
        tracing::info!(
            connection_id = %id,
            host = %handshake.requested_host(),
            protocol_version = handshake.protocol_version(),
            "new connection: {} -> {}",
            peer,
            route.name()
        );
    }

    let backend = match session::dial(route, ctx.timeouts.connect).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(
                connection_id = %id,
                route = %route.name(),
                backend = %route.backend(),
                error = %e,
                "Backend dial failed"
            );
            metrics::record_dial_failure(route.name());
            return Err(e);
        }
    };
    metrics::record_session(state.as_str(), route.name());

    let session = Session::new(id, peer, client, backend);
    match state {
        NextState::Status => {
            let (mut client, mut backend) = session.into_streams();
            status::relay(&mut client, &mut backend, &handshake, &ctx.timeouts).await
        }
        NextState::Login => login::relay(session, &handshake, &ctx.timeouts).await,
    }
}
