use std::time::Duration;

use axum::http;
use reqwest::Client;

/// Upper bound for a single remote call, including a `Prefer: wait` prediction
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Shared HTTP client for the remote API and audio downloads
///
/// Built once per service so connections are pooled across both.
pub(crate) fn build_http_client() -> reqwest::Result<Client> {
    let mut headers = http::HeaderMap::new();
    headers.insert(http::header::CONNECTION, http::HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .user_agent(concat!("resona/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()
}
