//! Wire protocol subsystem.
//!
//! # Data Flow
//! ```text
//! First bytes of a client connection
//!     → frame.rs (fixed header layout, bounds, port/VarInt helpers)
//!     → handshake.rs (validate, decode, status marker)
//!     → Handshake { host, port, next state, raw bytes }
//!
//! Status:  status.rs (request marker, length-prefixed response, ping/pong)
//! Login:   handshake.rs (forwarded host field, recomputed lengths)
//! ```
//!
//! # Design Decisions
//! - Nothing past the handshake is decoded; payloads are relayed as bytes
//! - Every bound is a named constant in frame.rs
//! - Rejections carry a reason for metrics but never produce a reply

pub mod frame;
pub mod handshake;
pub mod status;

pub use handshake::{read_handshake, DecodeError, Handshake, NextState};
pub use status::StatusResponse;
