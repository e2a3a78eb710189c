//! Accept loop.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Spawn one handler task per connection
//! - Stop accepting on shutdown and wait for live sessions to drain

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::ProxyConfig;
use crate::net::{ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::proxy::handler::{handle_connection, ProxyContext};
use crate::resilience::Timeouts;
use crate::routing::{RouteError, RouteTable};

/// Pause after a failed accept so persistent errors (e.g. EMFILE) do not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// The virtual-host proxy.
pub struct ProxyServer {
    ctx: Arc<ProxyContext>,
    tracker: ConnectionTracker,
}

impl ProxyServer {
    pub fn new(routes: RouteTable, timeouts: Timeouts) -> Self {
        Self {
            ctx: Arc::new(ProxyContext { routes, timeouts }),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Build the route table and time budgets from configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RouteError> {
        let routes = RouteTable::from_config(&config.routes)?;
        Ok(Self::new(routes, Timeouts::from(&config.timeouts)))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.ctx.routes
    }

    /// Accept and serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            address = %listener.local_addr().map_err(ListenerError::Bind)?,
            routes = self.ctx.routes.len(),
            fallback = %self.ctx.routes.fallback().name(),
            "Listening"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.spawn_session(stream, peer, permit),
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                    Err(e) => return Err(e),
                },
            }
        }
        drop(listener);

        let live = self.tracker.active_count();
        if live > 0 {
            tracing::info!(live, "Waiting for sessions to drain");
            let grace = self.ctx.timeouts.shutdown;
            if tokio::time::timeout(grace, self.tracker.drained()).await.is_err() {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain period elapsed, abandoning remaining sessions"
                );
            }
        }

        tracing::info!("Proxy server stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        metrics::record_connection();
        let _ = stream.set_nodelay(true);

        let guard = self.tracker.track();
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            // Slot and tracking are released when the task ends, however it ends.
            let _permit = permit;

            if let Err(e) = handle_connection(stream, peer, guard.id(), &ctx).await {
                metrics::record_session_error(e.kind());
            }
            drop(guard);
        });
    }
}
