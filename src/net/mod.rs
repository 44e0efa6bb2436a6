//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → connection.rs (HTTP/1.1 serving, timeouts, lifecycle tracking)
//!     → Hand off to the axum router
//!
//! Connection States:
//!     Accepted → Active → Draining (idle or shutdown) → Closed
//! ```
//!
//! # Design Decisions
//! - Each connection tracked for graceful shutdown
//! - Header-read timeout enforced by hyper, idle timeout by socket activity

pub mod connection;
pub mod listener;

pub use connection::{serve_connection, ConnectionSettings, ConnectionTracker};
pub use listener::{Listener, ListenerError};
