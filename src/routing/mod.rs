//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Decoded handshake (host, port)
//!     → router.rs (route lookup over "host:port")
//!     → matcher.rs (evaluate compiled patterns)
//!     → Return: matched Route, or the `default` fallback
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Resolve backend addresses
//!     → Compile patterns
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: definition order, last match wins
//! - Never "no match": the fallback route is always available

pub mod matcher;
pub mod router;

pub use matcher::HostPattern;
pub use router::{Route, RouteError, RouteTable};
