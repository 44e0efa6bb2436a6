//! Per-client rate limiting.
//!
//! # Responsibilities
//! - Keep one token bucket per client key
//! - Admit or deny each request before any routing work happens
//! - Evict buckets of clients that went quiet
//!
//! # Design Decisions
//! - Lookup, creation, consumption and eviction share one mutex, so a key
//!   never has two buckets
//! - Refill is continuous, computed from the time since the last update
//! - Eviction is best-effort: a client evicted mid-burst simply starts over
//!   with a full bucket

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::client_ip::{client_key, ClientKey};

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Rate-limit state of one client.
#[derive(Debug)]
struct ClientBucket {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Client key → bucket map with shared rate parameters.
#[derive(Debug)]
pub struct RateLimiterStore {
    clients: Mutex<HashMap<ClientKey, ClientBucket>>,
    rate: f64,
    burst: f64,
    lifetime: Duration,
    sweep_interval: Duration,
}

impl RateLimiterStore {
    /// Create a store with the default 5 minute client lifetime and 1 minute sweep.
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        let defaults = RateLimitConfig::default();
        Self::with_lifetime(
            requests_per_second,
            burst_size,
            defaults.client_ttl(),
            defaults.sweep_interval(),
        )
    }

    pub fn with_lifetime(
        requests_per_second: f64,
        burst_size: u32,
        lifetime: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            rate: requests_per_second,
            burst: f64::from(burst_size),
            lifetime,
            sweep_interval,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::with_lifetime(
            config.requests_per_second,
            config.burst_size,
            config.client_ttl(),
            config.sweep_interval(),
        )
    }

    /// Consume one token for `key`, creating its bucket on first sight.
    pub fn admit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.lock();
        let tracked = clients.len();
        let client = clients
            .entry(key.to_string())
            .or_insert_with(|| ClientBucket {
                bucket: TokenBucket::new(self.burst, now),
                last_seen: now,
            });
        client.last_seen = now;
        let admitted = client.bucket.try_acquire(now, self.burst, self.rate);
        if clients.len() != tracked {
            metrics::record_tracked_clients(clients.len());
        }
        admitted
    }

    /// Remove every bucket idle for longer than the client lifetime.
    /// Returns the number of evicted buckets.
    pub fn reap(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, client| now.saturating_duration_since(client.last_seen) <= self.lifetime);
        metrics::record_tracked_clients(clients.len());
        before - clients.len()
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Start the periodic eviction task. It runs until `shutdown` fires.
    pub fn spawn_reaper(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let period = store.sweep_interval;
            let mut ticker = time::interval_at(Instant::now() + period, period);

            tracing::debug!(
                interval_secs = period.as_secs(),
                lifetime_secs = store.lifetime.as_secs(),
                "Rate limiter reaper starting"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = store.reap();
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = store.len(), "Evicted idle rate limit buckets");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limiter reaper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientKey, ClientBucket>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// State for the rate-limit middleware.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub store: Arc<RateLimiterStore>,
    pub trusted_header: Option<HeaderName>,
}

impl RateLimitState {
    /// Build the middleware state.
    ///
    /// An invalid trusted header name is logged and ignored, falling back to
    /// peer addresses.
    pub fn new(store: Arc<RateLimiterStore>, trusted_header: &str) -> Self {
        let trusted_header = trusted_header.trim();
        let trusted_header = if trusted_header.is_empty() {
            None
        } else {
            match HeaderName::from_bytes(trusted_header.as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    tracing::warn!(
                        header = %trusted_header,
                        "Ignoring invalid trusted client IP header; using peer addresses"
                    );
                    None
                }
            }
        };
        Self {
            store,
            trusted_header,
        }
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(
        request.headers(),
        &addr.to_string(),
        state.trusted_header.as_ref(),
    );

    if state.store.admit(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited();
        too_many_requests()
    }
}

fn too_many_requests() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, HeaderValue::from_static("1"))],
        "Too Many Requests",
    )
        .into_response()
}
