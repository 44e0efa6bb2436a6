//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net/)
//!     → server.rs (middleware stack: request ID, tracing, rate limit)
//!     → routing/ (health, static, proxy, index page)
//!     → proxy.rs (pick upstream, rewrite, forward, stream back)
//!     → response.rs (locally generated responses)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::{ProxyError, ProxyState};
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, StartupError};
