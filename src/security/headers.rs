//! Header manipulation for proxied traffic.
//!
//! # Responsibilities
//! - Set X-Forwarded-Host, X-Forwarded-Proto and X-Real-IP
//! - Append the peer to X-Forwarded-For
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - Forwarding headers are overwritten, never merged (except X-Forwarded-For)
//! - Values that are not valid header values are dropped rather than failing the request

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Marker extension for requests whose connection was TLS-terminated by this node.
#[derive(Debug, Clone, Copy)]
pub struct TlsTerminated;

/// Identity headers injected into a forwarded request.
#[derive(Debug, Clone)]
pub struct ForwardedHeaders {
    /// The inbound `Host`.
    pub host: Option<HeaderValue>,
    pub proto: &'static str,
    /// First-hop client identity.
    pub real_ip: String,
    /// Socket peer of the inbound connection.
    pub peer_ip: IpAddr,
}

impl ForwardedHeaders {
    /// Write the forwarding headers into an outbound header map.
    pub fn apply(&self, headers: &mut HeaderMap) {
        match &self.host {
            Some(host) => {
                headers.insert(X_FORWARDED_HOST, host.clone());
            }
            None => {
                headers.remove(X_FORWARDED_HOST);
            }
        }
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static(self.proto));
        match HeaderValue::from_str(&self.real_ip) {
            Ok(value) => {
                headers.insert(X_REAL_IP, value);
            }
            Err(_) => {
                headers.remove(X_REAL_IP);
            }
        }
        append_forwarded_for(headers, self.peer_ip);
    }
}

/// `"https"` when TLS was terminated here or an inbound X-Forwarded-Proto says so.
pub fn forwarded_proto(headers: &HeaderMap, tls_terminated: bool) -> &'static str {
    let inbound_https = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false);
    if tls_terminated || inbound_https {
        "https"
    } else {
        "http"
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, peer_ip: IpAddr) {
    let peer = peer_ip.to_string();
    let chain = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ");
    let value = if chain.is_empty() {
        peer
    } else {
        format!("{chain}, {peer}")
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_proto() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_proto(&headers, false), "http");
        assert_eq!(forwarded_proto(&headers, true), "https");

        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("HTTPS"));
        assert_eq!(forwarded_proto(&headers, false), "https");

        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("gopher"));
        assert_eq!(forwarded_proto(&headers, false), "http");
    }

    #[test]
    fn test_apply_overwrites_identity_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REAL_IP, HeaderValue::from_static("6.6.6.6"));
        headers.insert(X_FORWARDED_HOST, HeaderValue::from_static("spoofed"));
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("1.1.1.1, 2.2.2.2"));

        ForwardedHeaders {
            host: Some(HeaderValue::from_static("edge.example.com")),
            proto: "http",
            real_ip: "1.1.1.1".into(),
            peer_ip: "10.0.0.9".parse().unwrap(),
        }
        .apply(&mut headers);

        assert_eq!(headers[X_REAL_IP], "1.1.1.1");
        assert_eq!(headers[X_FORWARDED_HOST], "edge.example.com");
        assert_eq!(headers[X_FORWARDED_PROTO], "http");
        assert_eq!(headers[X_FORWARDED_FOR], "1.1.1.1, 2.2.2.2, 10.0.0.9");
    }

    #[test]
    fn test_forwarded_for_created_and_merged() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.9".parse().unwrap());
        assert_eq!(headers[X_FORWARDED_FOR], "10.0.0.9");

        let mut headers = HeaderMap::new();
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("1.1.1.1"));
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("2.2.2.2"));
        append_forwarded_for(&mut headers, "::1".parse().unwrap());
        assert_eq!(headers.get_all(X_FORWARDED_FOR).iter().count(), 1);
        assert_eq!(headers[X_FORWARDED_FOR], "1.1.1.1, 2.2.2.2, ::1");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session-hint"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hint", HeaderValue::from_static("abc"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }
}
