//! Command-line and environment overrides.
//!
//! Every flag falls back to an `EDGE_NODE_*` environment variable; values
//! given either way override the config file, which overrides the defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ProxyConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Default, Parser)]
#[command(name = "edge-node")]
#[command(about = "HTTP edge node: static files, round-robin reverse proxy, per-client rate limiting", long_about = None)]
pub struct Cli {
    /// Optional TOML configuration file
    #[arg(long, env = "EDGE_NODE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, env = "EDGE_NODE_LISTEN")]
    pub listen: Option<String>,

    /// Directory served as static content (empty disables)
    #[arg(long, env = "EDGE_NODE_STATIC_DIR")]
    pub static_dir: Option<String>,

    /// URL prefix for static files
    #[arg(long, env = "EDGE_NODE_STATIC_PREFIX")]
    pub static_prefix: Option<String>,

    /// URL prefix reverse-proxied to the upstreams
    #[arg(long, env = "EDGE_NODE_PROXY_PREFIX")]
    pub proxy_prefix: Option<String>,

    /// Comma-separated upstream base URLs
    #[arg(long, env = "EDGE_NODE_UPSTREAMS")]
    pub upstreams: Option<String>,

    /// Requests per second allowed per client
    #[arg(long, env = "EDGE_NODE_RPS")]
    pub rps: Option<f64>,

    /// Burst size per client
    #[arg(long, env = "EDGE_NODE_BURST")]
    pub burst: Option<u32>,

    /// Header carrying the real client IP, e.g. X-Real-IP
    #[arg(long, env = "EDGE_NODE_TRUSTED_HEADER")]
    pub trusted_header: Option<String>,

    /// Prometheus scrape address (empty disables)
    #[arg(long, env = "EDGE_NODE_METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, env = "EDGE_NODE_LOG_FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    /// Build the effective configuration: defaults, then file, then overrides.
    pub fn load(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Overlay the values present on the command line or in the environment.
    pub fn apply(self, config: &mut ProxyConfig) {
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(dir) = self.static_dir {
            config.static_files.dir = dir;
        }
        if let Some(prefix) = self.static_prefix {
            config.static_files.prefix = prefix;
        }
        if let Some(prefix) = self.proxy_prefix {
            config.proxy.prefix = prefix;
        }
        if let Some(upstreams) = self.upstreams {
            config.proxy.upstreams = upstreams;
        }
        if let Some(rps) = self.rps {
            config.rate_limit.requests_per_second = rps;
        }
        if let Some(burst) = self.burst {
            config.rate_limit.burst_size = burst;
        }
        if let Some(header) = self.trusted_header {
            config.rate_limit.trusted_header = header;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_address = addr;
        }
        if let Some(filter) = self.log_filter {
            config.observability.log_filter = filter;
        }
    }
}
