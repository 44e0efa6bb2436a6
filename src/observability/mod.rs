//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Per request (wired in http/server.rs):
//!     → x-request-id assigned or kept
//!     → TraceLayer span (method, uri, request id) and response log
//! ```
//!
//! # Design Decisions
//! - Request ID flows to the upstream and back to the client
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
