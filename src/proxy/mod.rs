//! Session forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs (accept, spawn per connection)
//!     → handler.rs
//!         → protocol::read_handshake
//!         → routing::RouteTable::select
//!         → session.rs (dial backend, pair sockets)
//!         → next state = status → status.rs (one exchange + ping/pong)
//!           next state = login  → login.rs  (rewritten handshake + byte pipe)
//!     → sockets closed, permit released
//! ```
//!
//! # Design Decisions
//! - No state shared between sessions except the read-only route table
//! - Nothing after the handshake is decoded on the login path

pub mod handler;
pub mod login;
pub mod server;
pub mod session;
pub mod status;

pub use handler::{handle_connection, ProxyContext};
pub use server::ProxyServer;
pub use session::{Session, SessionError};
