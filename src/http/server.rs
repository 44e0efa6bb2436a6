//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the subsystems from a validated configuration
//! - Wire up middleware (request ID, tracing, rate limiting)
//! - Run the accept loop and hand connections to the network layer
//! - Drain connections on shutdown within the grace period
//!
//! # Design Decisions
//! - Every request passes the rate limiter before routing, health checks included
//! - Request ID assigned outermost so every log line of a request carries it

use std::sync::Arc;

use axum::{middleware, Router};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{validate_config, ProxyConfig, ValidationError};
use crate::http::proxy::ProxyState;
use crate::http::request::{request_span, MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{RoundRobin, UpstreamError};
use crate::net::{serve_connection, ConnectionSettings, ConnectionTracker, Listener, ListenerError};
use crate::routing::{route_table, PathPrefix, StaticRoute};
use crate::security::{rate_limit_middleware, RateLimitState, RateLimiterStore};

/// Reasons the server cannot be built.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join(.0))]
    Config(Vec<ValidationError>),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Listen(#[from] ListenerError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The edge node HTTP server.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    limiter: Arc<RateLimiterStore>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(StartupError::Config)?;

        let balancer = RoundRobin::from_list(&config.proxy.upstreams)?;
        if balancer.targets().is_empty() {
            tracing::warn!("No upstreams configured; proxied requests will fail with 502");
        }
        for target in balancer.targets() {
            tracing::info!(upstream = %target, "Upstream registered");
        }

        let proxy = Arc::new(ProxyState::new(
            PathPrefix::new(&config.proxy.prefix),
            Arc::new(balancer),
            &config.proxy,
        ));

        let static_route = config.static_files.enabled().then(|| StaticRoute {
            prefix: PathPrefix::new(&config.static_files.prefix),
            dir: config.static_files.dir.trim().into(),
        });
        if let Some(route) = &static_route {
            tracing::info!(prefix = %route.prefix, dir = %route.dir.display(), "Serving static files");
        }

        let limiter = Arc::new(RateLimiterStore::from_config(&config.rate_limit));
        let rate_limit = RateLimitState::new(Arc::clone(&limiter), &config.rate_limit.trusted_header);

        let router = Self::build_router(route_table(proxy, static_route.as_ref()), rate_limit);

        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the server, then bind its listener.
    ///
    /// Configuration errors surface before any socket is bound.
    pub async fn bind(config: ProxyConfig) -> Result<(Self, Listener), StartupError> {
        let bind_address = config.listener.bind_address.clone();
        let server = Self::new(config)?;
        let listener = Listener::bind(&bind_address).await?;
        Ok((server, listener))
    }

    /// Wrap the route table with the middleware stack.
    fn build_router(routes: Router, rate_limit: RateLimitState) -> Router {
        routes.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(request_span)
                        .on_response(DefaultOnResponse::new().level(Level::INFO))
                        // Handlers log their own failures.
                        .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
                )
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware)),
        )
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(self, listener: impl Into<Listener>, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let listener = listener.into();
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reaper = self.limiter.spawn_reaper(shutdown.subscribe());
        let tracker = ConnectionTracker::new();
        let settings = ConnectionSettings {
            header_read_timeout: self.config.listener.header_read_timeout(),
            idle_timeout: self.config.listener.idle_timeout(),
        };

        let mut stop = shutdown.subscribe();
        loop {
            // Subscribed before accepting so a shutdown racing the accept still
            // reaches the new connection.
            let connection_shutdown = shutdown.subscribe();
            tokio::select! {
                (stream, peer) = listener.accept() => {
                    let guard = tracker.track();
                    tracing::trace!(connection_id = %guard.id(), peer_addr = %peer, "Serving connection");
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        self.router.clone(),
                        settings,
                        connection_shutdown,
                        guard,
                    ));
                }
                _ = stop.recv() => break,
            }
        }
        drop(listener);

        let grace = self.config.listener.shutdown_grace();
        tracing::info!(
            active_connections = tracker.active_count(),
            grace_secs = grace.as_secs(),
            "Stopped accepting, draining connections"
        );
        if !tracker.wait_for_drain(grace).await {
            tracing::warn!(
                active_connections = tracker.active_count(),
                "Grace period elapsed with connections still open"
            );
        }

        if let Err(e) = reaper.await {
            tracing::debug!(error = %e, "Rate limiter reaper ended abnormally");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
