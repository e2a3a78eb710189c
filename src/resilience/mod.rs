//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Session stage (dial, handshake, status step, relay read)
//!     → timeouts.rs (deadline for that stage)
//!     → Ok(output) or TimeoutError { stage }
//! ```
//!
//! # Design Decisions
//! - Every blocking socket operation has a budget
//! - No retries: a failed dial ends the session

pub mod timeouts;

pub use timeouts::{within, IdleClock, Stage, TimeoutError, Timeouts};
