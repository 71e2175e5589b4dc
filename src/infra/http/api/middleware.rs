use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::{super::HttpState, error::ApiError};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Reads pass through; writes are limited per client and path.
pub async fn api_rate_limit(
    State(state): State<HttpState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::GET || request.method() == Method::HEAD {
        return next.run(request).await;
    }

    let client = client_key(&request, state.rate_limiter.trusts_forwarded_for());
    let path = request.uri().path().to_string();
    if !state.rate_limiter.allow(&client, &path) {
        debug!(client = %client, path = %path, "Rate limit exceeded");
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    next.run(request).await
}

/// Peer address unless the forwarded header is trusted; the header also
/// serves when no peer address is known.
fn client_key(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    if !trust_forwarded_for {
        if let Some(peer) = peer.clone() {
            return peer;
        }
    }

    request
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or(peer)
        .unwrap_or_else(|| "unknown".to_string())
}
