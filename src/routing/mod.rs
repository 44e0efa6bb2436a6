//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → /healthz                     → liveness "ok"
//!     → static prefix (path-stripped) → ServeDir
//!     → proxy prefix (path-stripped)  → http/proxy.rs
//!     → anything else                → informational page
//!
//! Route Compilation (at startup):
//!     configured prefixes
//!     → matcher.rs (normalize to /name/)
//!     → router.rs (freeze as immutable axum Router)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::PathPrefix;
pub use router::{route_table, StaticRoute, HEALTH_PATH};
