//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: comma-separated upstream list
//!     → target.rs (parse each entry, fail fast on the first bad one)
//!     → round_robin.rs (freeze ordered target list)
//!
//! Per proxied request:
//!     → LoadBalancer::next_target()
//!     → Some(target) or None when no upstream is configured
//! ```
//!
//! # Design Decisions
//! - Target list is immutable after construction; only the cursor moves
//! - The cursor is a single atomic counter, so concurrent callers never
//!   observe the same position twice
//! - "No target" is a configuration state, not an error

pub mod round_robin;
pub mod target;

pub use round_robin::RoundRobin;
pub use target::{UpstreamError, UpstreamTarget};

/// Strategy for picking the upstream of the next proxied request.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Return the next target, or `None` if no targets are configured.
    fn next_target(&self) -> Option<&UpstreamTarget>;

    /// Number of configured targets.
    fn count(&self) -> usize;
}
