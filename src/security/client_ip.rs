//! Client identity resolution.
//!
//! # Responsibilities
//! - Derive the rate-limit key for a request
//! - Derive the real client IP reported to upstreams
//!
//! # Design Decisions
//! - The trusted header is operator-configured; its value is used verbatim
//! - The forwarded-for identity only looks at the first hop of the chain
//! - Both fall back to the host part of the peer address, or the raw peer
//!   string if it cannot be split
//! - Keys are an approximation of a client (NAT, proxies), not a security boundary

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName};

use crate::security::headers::X_FORWARDED_FOR;

/// Identifies the origin of a request for rate limiting.
pub type ClientKey = String;

/// Rate-limit identity: the trusted header value when configured and present,
/// else the peer host.
pub fn client_key(
    headers: &HeaderMap,
    remote_addr: &str,
    trusted_header: Option<&HeaderName>,
) -> ClientKey {
    trusted_header
        .and_then(|name| header_str(headers, name))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer_host(remote_addr))
}

/// Forwarded identity: the first entry of `X-Forwarded-For`, else the peer host.
pub fn forwarded_client_ip(headers: &HeaderMap, remote_addr: &str) -> String {
    header_str(headers, &X_FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer_host(remote_addr))
}

/// Host part of a `host:port` peer address. Unparseable input is returned as-is.
pub fn peer_host(remote_addr: &str) -> String {
    if let Ok(addr) = remote_addr.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    match remote_addr.rsplit_once(':') {
        Some((host, _port)) if !host.is_empty() && !host.contains(':') => host.to_string(),
        Some((host, _port)) if host.starts_with('[') && host.ends_with(']') => {
            host[1..host.len() - 1].to_string()
        }
        _ => remote_addr.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
