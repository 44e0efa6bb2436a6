//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (resolve client key: trusted header or peer host)
//!     → rate_limit.rs (admit / deny with 429)
//!     → Pass to routing
//!
//! Proxied request:
//!     → client_ip.rs (first hop of X-Forwarded-For, or peer host)
//!     → headers.rs (strip hop-by-hop, set X-Forwarded-*, X-Real-IP)
//! ```
//!
//! # Design Decisions
//! - Rate limiting runs before any route work
//! - Client state is bounded by periodic eviction
//! - Trusted header is configuration, never inferred

pub mod client_ip;
pub mod headers;
pub mod rate_limit;

pub use client_ip::{client_key, forwarded_client_ip, ClientKey};
pub use rate_limit::{rate_limit_middleware, RateLimitState, RateLimiterStore};
