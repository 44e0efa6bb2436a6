//! Locally generated responses.
//!
//! # Responsibilities
//! - Liveness response for the health endpoint
//! - Informational HTML page for `/` and unmatched paths
//! - Redirect from a bare route prefix to its normalized form

use axum::{
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};

use crate::routing::PathPrefix;

pub async fn health() -> &'static str {
    "ok"
}

/// Descriptive status page listing the mounted routes.
#[derive(Debug, Clone)]
pub struct IndexPage {
    html: Html<String>,
}

impl IndexPage {
    pub fn new(static_prefix: Option<&PathPrefix>, proxy_prefix: &PathPrefix, upstreams: usize) -> Self {
        let static_line = match static_prefix {
            Some(prefix) => format!("<code>{prefix}</code>"),
            None => "disabled".to_string(),
        };
        let html = format!(
            r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>edge-node</title>
  <style>
    body {{ font-family: ui-sans-serif, system-ui, sans-serif; margin: 2rem; }}
    code {{ background: #f4f4f5; padding: 2px 6px; border-radius: 6px; }}
    .card {{ border: 1px solid #e4e4e7; border-radius: 12px; padding: 1rem 1.25rem; margin-bottom: 1rem; }}
    h1 {{ margin-top: 0; }}
  </style>
</head>
<body>
  <h1>edge-node</h1>
  <div class="card"><strong>Static:</strong> {static_line}</div>
  <div class="card"><strong>Proxy:</strong> <code>{proxy_prefix}</code> (round-robin, {upstreams} upstream(s))</div>
  <div class="card"><strong>Health:</strong> <code>/healthz</code></div>
  <div class="card"><strong>Rate limit:</strong> per client</div>
</body>
</html>"#
        );
        Self { html: Html(html) }
    }

    pub fn html(&self) -> Html<String> {
        self.html.clone()
    }
}

/// 301 to `prefix`, keeping the query string.
pub fn redirect_to_prefix(prefix: &PathPrefix, uri: &Uri) -> Response {
    let location = match uri.query() {
        Some(query) => format!("{}?{}", prefix, query),
        None => prefix.to_string(),
    };
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}
