//! Reverse proxy forwarding.
//!
//! # Responsibilities
//! - Pick the upstream for each request (round robin)
//! - Rewrite URI, `Host` and forwarding headers
//! - Stream the upstream response back without buffering
//! - Translate transport failures into 502 responses
//!
//! # Design Decisions
//! - Upstream HTTP error statuses are relayed as-is
//! - Waiting for response headers is bounded by the upstream timeout
//! - Dropping the handler future (client went away) drops the upstream call
//! - Failure details go to the log, never to the client

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode, Version},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;
use crate::load_balancer::LoadBalancer;
use crate::observability::metrics;
use crate::routing::PathPrefix;
use crate::security::client_ip::forwarded_client_ip;
use crate::security::headers::{forwarded_proto, strip_hop_by_hop, ForwardedHeaders, TlsTerminated};

pub type HttpClient = Client<HttpConnector, Body>;

/// Why a request could not be proxied.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no upstream configured")]
    NoUpstream,

    #[error("cannot build request for upstream {upstream}: {source}")]
    Request {
        upstream: String,
        #[source]
        source: axum::http::Error,
    },

    #[error("upstream {upstream} request failed: {source}")]
    Transport {
        upstream: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {upstream} did not respond within {after:?}")]
    Timeout { upstream: String, after: Duration },
}

impl ProxyError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::NoUpstream => "no_upstream",
            ProxyError::Request { .. } => "request",
            ProxyError::Transport { source, .. } if source.is_connect() => "connect",
            ProxyError::Transport { .. } => "transport",
            ProxyError::Timeout { .. } => "timeout",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match self {
            ProxyError::NoUpstream => "no upstream configured",
            _ => "upstream error",
        };
        (StatusCode::BAD_GATEWAY, body).into_response()
    }
}

/// Shared state of the proxy route.
#[derive(Debug)]
pub struct ProxyState {
    prefix: PathPrefix,
    balancer: Arc<dyn LoadBalancer>,
    client: HttpClient,
    upstream_timeout: Duration,
}

impl ProxyState {
    pub fn new(prefix: PathPrefix, balancer: Arc<dyn LoadBalancer>, config: &UpstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout()));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            prefix,
            balancer,
            client,
            upstream_timeout: config.timeout(),
        }
    }

    pub fn prefix(&self) -> &PathPrefix {
        &self.prefix
    }

    pub fn upstream_count(&self) -> usize {
        self.balancer.count()
    }

    /// Forward one request to the next upstream.
    pub async fn forward(&self, peer: SocketAddr, request: Request<Body>) -> Result<Response, ProxyError> {
        let start = Instant::now();

        // 1. Select upstream
        let target = self.balancer.next_target().ok_or(ProxyError::NoUpstream)?;
        let upstream = target.to_string();

        // 2. Rewrite URI
        let (mut parts, body) = request.into_parts();
        let path = self
            .prefix
            .strip(parts.uri.path())
            .unwrap_or_else(|| parts.uri.path());
        let uri = target
            .request_uri(path, parts.uri.query())
            .map_err(|source| ProxyError::Request {
                upstream: upstream.clone(),
                source,
            })?;

        // 3. Forwarding headers, computed from the inbound request
        let forwarded = ForwardedHeaders {
            host: parts.headers.get(header::HOST).cloned().or_else(|| {
                parts
                    .uri
                    .authority()
                    .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            }),
            proto: forwarded_proto(&parts.headers, parts.extensions.get::<TlsTerminated>().is_some()),
            real_ip: forwarded_client_ip(&parts.headers, &peer.to_string()),
            peer_ip: peer.ip(),
        };

        strip_hop_by_hop(&mut parts.headers);
        forwarded.apply(&mut parts.headers);
        parts.headers.insert(header::HOST, target.host_header());
        parts.uri = uri;
        parts.version = Version::HTTP_11;

        tracing::debug!(upstream = %upstream, uri = %parts.uri, "Forwarding request");

        // 4. Forward
        let outbound = Request::from_parts(parts, body);
        let response = match tokio::time::timeout(self.upstream_timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => return Err(ProxyError::Transport { upstream, source }),
            Err(_) => {
                return Err(ProxyError::Timeout {
                    upstream,
                    after: self.upstream_timeout,
                })
            }
        };

        metrics::record_upstream_response(&upstream, response.status().as_u16(), start);

        // 5. Relay, streaming the body
        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Handler for the proxy route.
pub async fn proxy_handler(
    State(state): State<Arc<ProxyState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match state.forward(peer, request).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::NoUpstream => {
                    tracing::warn!(method = %method, path = %path, "No upstream configured for proxy route");
                }
                _ => {
                    tracing::error!(method = %method, path = %path, kind = err.kind(), error = %err, "Proxy error");
                }
            }
            metrics::record_upstream_failure(err.kind());
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::RoundRobin;

    fn state(upstreams: &str) -> ProxyState {
        ProxyState::new(
            PathPrefix::new("/proxy"),
            Arc::new(RoundRobin::from_list(upstreams).unwrap()),
            &UpstreamConfig::default(),
        )
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    #[tokio::test]
    async fn test_no_upstream_is_bad_gateway() {
        let state = state("");
        let request = Request::builder().uri("/proxy/x").body(Body::empty()).unwrap();
        let err = state.forward(peer(), request).await.unwrap_err();
        assert!(matches!(err, ProxyError::NoUpstream));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"no upstream configured");
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let state = state(&format!("http://{addr}"));
        let request = Request::builder().uri("/proxy/x").body(Body::empty()).unwrap();
        let err = state.forward(peer(), request).await.unwrap_err();
        assert!(matches!(err, ProxyError::Transport { .. }));
        assert_eq!(err.kind(), "connect");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"upstream error");
    }

    #[tokio::test]
    async fn test_stalled_upstream_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = UpstreamConfig {
            timeout_secs: 1,
            ..UpstreamConfig::default()
        };
        let state = ProxyState::new(
            PathPrefix::new("/proxy"),
            Arc::new(RoundRobin::from_list(&format!("http://{addr}")).unwrap()),
            &config,
        );
        let request = Request::builder().uri("/proxy/slow").body(Body::empty()).unwrap();
        let err = state.forward(peer(), request).await.unwrap_err();
        assert!(matches!(err, ProxyError::Timeout { .. }));
    }
}
