//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, rate finite)
//! - Detect conflicting route prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Upstream URLs are checked when the selector is built, not here

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;
use crate::routing::{PathPrefix, HEALTH_PATH};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("rate_limit.requests_per_second must be a finite, non-negative number (got {0})")]
    RequestRate(f64),

    #[error("{field} '{prefix}' is not a usable route prefix: {reason}")]
    Prefix {
        field: &'static str,
        prefix: String,
        reason: &'static str,
    },

    #[error("static prefix '{0}' and proxy prefix '{1}' overlap")]
    OverlappingPrefixes(String, String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let durations = [
        ("listener.header_read_timeout_secs", config.listener.header_read_timeout_secs),
        ("listener.idle_timeout_secs", config.listener.idle_timeout_secs),
        ("listener.shutdown_grace_secs", config.listener.shutdown_grace_secs),
        ("proxy.connect_timeout_secs", config.proxy.connect_timeout_secs),
        ("proxy.timeout_secs", config.proxy.timeout_secs),
        ("rate_limit.client_ttl_secs", config.rate_limit.client_ttl_secs),
        ("rate_limit.sweep_interval_secs", config.rate_limit.sweep_interval_secs),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    let rps = config.rate_limit.requests_per_second;
    if !rps.is_finite() || rps < 0.0 {
        errors.push(ValidationError::RequestRate(rps));
    }

    let proxy_prefix = check_prefix("proxy.prefix", &config.proxy.prefix, &mut errors);
    if config.static_files.enabled() {
        let static_prefix =
            check_prefix("static_files.prefix", &config.static_files.prefix, &mut errors);
        if let (Some(s), Some(p)) = (static_prefix, proxy_prefix) {
            if s.as_str().starts_with(p.as_str()) || p.as_str().starts_with(s.as_str()) {
                errors.push(ValidationError::OverlappingPrefixes(
                    s.as_str().to_string(),
                    p.as_str().to_string(),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_prefix(
    field: &'static str,
    raw: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<PathPrefix> {
    let prefix = PathPrefix::new(raw);
    let reason = if prefix.is_root() {
        Some("the root path is reserved for the informational page")
    } else if prefix.as_str().contains(['{', '}'])
        || prefix
            .as_str()
            .split('/')
            .any(|segment| segment.starts_with([':', '*']))
    {
        Some("route pattern characters are not allowed")
    } else if prefix.mount_path() == HEALTH_PATH {
        Some("it would shadow the health endpoint")
    } else {
        None
    };

    match reason {
        Some(reason) => {
            errors.push(ValidationError::Prefix {
                field,
                prefix: raw.to_string(),
                reason,
            });
            None
        }
        None => Some(prefix),
    }
}
