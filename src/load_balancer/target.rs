//! Upstream target abstraction.
//!
//! # Responsibilities
//! - Parse and validate one upstream base URL
//! - Produce the outbound request URI for a proxied path
//! - Provide the `Host` value used when talking to the upstream

use axum::http::{HeaderValue, Uri};
use url::{Position, Url};

/// Error produced while parsing the upstream list.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream '{entry}': {source}")]
    Parse {
        entry: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid upstream '{entry}': {reason}")]
    Unsupported { entry: String, reason: &'static str },
}

/// An absolute upstream base URL. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    url: Url,
    /// `host[:port]`, brackets kept for IPv6.
    authority: String,
}

impl UpstreamTarget {
    /// Parse one upstream entry. Only absolute `http` URLs with a host are accepted.
    pub fn parse(entry: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(entry).map_err(|source| UpstreamError::Parse {
            entry: entry.to_string(),
            source,
        })?;

        if url.scheme() != "http" {
            return Err(UpstreamError::Unsupported {
                entry: entry.to_string(),
                reason: "only http:// upstreams are supported",
            });
        }
        if !url.has_host() {
            return Err(UpstreamError::Unsupported {
                entry: entry.to_string(),
                reason: "missing host",
            });
        }

        let authority = url[Position::BeforeHost..Position::AfterPort].to_string();
        if authority.is_empty() || HeaderValue::from_str(&authority).is_err() {
            return Err(UpstreamError::Unsupported {
                entry: entry.to_string(),
                reason: "missing host",
            });
        }

        Ok(Self { url, authority })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Value for the outbound `Host` header.
    pub fn host_header(&self) -> HeaderValue {
        // Checked in `parse`.
        HeaderValue::from_str(&self.authority).unwrap_or_else(|_| HeaderValue::from_static(""))
    }

    /// Build the URI for forwarding `path` (already stripped of the route prefix)
    /// and `query` to this upstream.
    ///
    /// The target's base path and the request path are joined with a single
    /// slash; the target's own query, if any, comes first.
    pub fn request_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, axum::http::Error> {
        let mut path_and_query = join_path(self.url.path(), path);
        match (self.url.query().filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
            (Some(base), Some(extra)) => {
                path_and_query.push('?');
                path_and_query.push_str(base);
                path_and_query.push('&');
                path_and_query.push_str(extra);
            }
            (Some(q), None) | (None, Some(q)) => {
                path_and_query.push('?');
                path_and_query.push_str(q);
            }
            (None, None) => {}
        }

        Uri::builder()
            .scheme(self.url.scheme())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()
    }
}

impl std::fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.url.scheme(), self.authority)
    }
}

fn join_path(base: &str, rest: &str) -> String {
    match (base.ends_with('/'), rest.starts_with('/')) {
        (true, true) => format!("{}{}", base, &rest[1..]),
        (false, false) => format!("{}/{}", base, rest),
        _ => format!("{}{}", base, rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_host() {
        let target = UpstreamTarget::parse("http://127.0.0.1:3000").unwrap();
        assert_eq!(target.authority(), "127.0.0.1:3000");
        assert_eq!(target.to_string(), "http://127.0.0.1:3000");
        assert_eq!(target.host_header(), "127.0.0.1:3000");
    }

    #[test]
    fn test_parse_ipv6_and_default_port() {
        let target = UpstreamTarget::parse("http://[::1]:8080/").unwrap();
        assert_eq!(target.authority(), "[::1]:8080");

        let target = UpstreamTarget::parse("http://backend.internal").unwrap();
        assert_eq!(target.authority(), "backend.internal");
    }

    #[test]
    fn test_rejects_relative_and_unsupported() {
        assert!(matches!(
            UpstreamTarget::parse("not a url"),
            Err(UpstreamError::Parse { .. })
        ));
        assert!(matches!(
            UpstreamTarget::parse("localhost:8080"),
            Err(UpstreamError::Unsupported { .. })
        ));
        assert!(matches!(
            UpstreamTarget::parse("https://example.com"),
            Err(UpstreamError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_error_names_entry() {
        let err = UpstreamTarget::parse("http://exa mple.com").unwrap_err();
        assert!(err.to_string().contains("'http://exa mple.com'"));
    }

    #[test]
    fn test_request_uri() {
        let target = UpstreamTarget::parse("http://10.0.0.1:3000").unwrap();
        let uri = target.request_uri("/x", Some("a=1")).unwrap();
        assert_eq!(uri.to_string(), "http://10.0.0.1:3000/x?a=1");

        let uri = target.request_uri("/", None).unwrap();
        assert_eq!(uri.to_string(), "http://10.0.0.1:3000/");
    }

    #[test]
    fn test_request_uri_with_base_path_and_query() {
        let target = UpstreamTarget::parse("http://10.0.0.1:3000/api?key=k").unwrap();
        let uri = target.request_uri("/users/7", Some("full=true")).unwrap();
        assert_eq!(uri.to_string(), "http://10.0.0.1:3000/api/users/7?key=k&full=true");

        let target = UpstreamTarget::parse("http://10.0.0.1:3000/api/").unwrap();
        let uri = target.request_uri("/users", None).unwrap();
        assert_eq!(uri.path(), "/api/users");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "/x"), "/x");
        assert_eq!(join_path("/a", "x"), "/a/x");
        assert_eq!(join_path("/a/", "/x"), "/a/x");
        assert_eq!(join_path("/a", "/x"), "/a/x");
    }
}
