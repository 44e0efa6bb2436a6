//! Route table construction.
//!
//! # Responsibilities
//! - Mount the health, static, proxy and informational routes
//! - Strip route prefixes before handing requests to static/proxy handlers
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exact `/healthz` first, then the configured prefixes, then the fallback page
//! - The proxy route is always mounted; with no upstreams it answers 502

use std::path::PathBuf;
use std::sync::Arc;

use axum::{http::Uri, routing::any, Router};
use tower_http::services::ServeDir;

use crate::http::proxy::{proxy_handler, ProxyState};
use crate::http::response::{health, redirect_to_prefix, IndexPage};
use crate::routing::matcher::PathPrefix;

/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/healthz";

/// A directory served below a prefix.
#[derive(Debug, Clone)]
pub struct StaticRoute {
    pub prefix: PathPrefix,
    pub dir: PathBuf,
}

/// Build the route table.
pub fn route_table(proxy: Arc<ProxyState>, static_route: Option<&StaticRoute>) -> Router {
    let index = IndexPage::new(
        static_route.map(|route| &route.prefix),
        proxy.prefix(),
        proxy.upstream_count(),
    );
    let proxy_prefix = proxy.prefix().clone();

    let mut router = Router::new().route(HEALTH_PATH, any(health));

    if let Some(route) = static_route {
        router = router.nest_service(route.prefix.mount_path(), ServeDir::new(&route.dir));
    }

    router
        .route(&format!("{}{{*rest}}", proxy_prefix), any(proxy_handler))
        .route(proxy_prefix.as_str(), any(proxy_handler))
        .route(
            proxy_prefix.mount_path(),
            any({
                let prefix = proxy_prefix.clone();
                move |uri: Uri| {
                    let response = redirect_to_prefix(&prefix, &uri);
                    async move { response }
                }
            }),
        )
        .fallback(move || {
            let page = index.html();
            async move { page }
        })
        .with_state(proxy)
}
