//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge node.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the edge node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection timeouts).
    pub listener: ListenerConfig,

    /// Static file route.
    pub static_files: StaticConfig,

    /// Reverse proxy route and upstream pool.
    pub proxy: UpstreamConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum time a client may take to send a complete request head.
    pub header_read_timeout_secs: u64,

    /// A connection with no socket activity for this long is closed.
    pub idle_timeout_secs: u64,

    /// How long shutdown waits for open connections to drain.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            header_read_timeout_secs: 10,
            idle_timeout_secs: 60,
            shutdown_grace_secs: 30,
        }
    }
}

impl ListenerConfig {
    pub fn header_read_timeout(&self) -> Duration {
        Duration::from_secs(self.header_read_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Static file route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Directory to serve. Empty disables the static route.
    pub dir: String,

    /// URL prefix the directory is mounted under.
    pub prefix: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            prefix: "/static".to_string(),
        }
    }
}

impl StaticConfig {
    /// Whether the static route should be mounted.
    pub fn enabled(&self) -> bool {
        !self.dir.trim().is_empty()
    }
}

/// Reverse proxy route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// URL prefix forwarded to the upstream pool.
    pub prefix: String,

    /// Comma-separated upstream base URLs (e.g., "http://10.0.0.1:3000,http://10.0.0.2:3000").
    pub upstreams: String,

    /// Upstream connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum wait for upstream response headers in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            prefix: "/proxy".to_string(),
            upstreams: String::new(),
            connect_timeout_secs: 5,
            timeout_secs: 30,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained requests per second allowed per client.
    pub requests_per_second: f64,

    /// Burst capacity per client.
    pub burst_size: u32,

    /// Header carrying the real client IP when set by a trusted front proxy.
    /// Empty means the socket peer address is used.
    pub trusted_header: String,

    /// Idle time after which a client's bucket is evicted.
    pub client_ttl_secs: u64,

    /// Interval between eviction sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5.0,
            burst_size: 10,
            trusted_header: String::new(),
            client_ttl_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn client_ttl(&self) -> Duration {
        Duration::from_secs(self.client_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default tracing filter, overridden by `RUST_LOG`.
    pub log_filter: String,

    /// Prometheus scrape address. Empty disables the exporter.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "edge_node=info,tower_http=info".to_string(),
            metrics_address: String::new(),
        }
    }
}
