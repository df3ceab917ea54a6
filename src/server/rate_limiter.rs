use crate::governor_conf::ClientRateLimiter;
use crate::server::types::ErrorResponse;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<ClientRateLimiter>,
    /// Proxies in front of the service that append to `X-Forwarded-For`.
    pub trusted_proxy_count: usize,
}

/// Hop written by the outermost trusted proxy, i.e. the entry just before the
/// last `trusted_proxy_count` ones. Anything the client sent further left is
/// ignored.
fn forwarded_client(header_value: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let hops: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();

    if hops.len() <= trusted_proxy_count {
        return None;
    }
    hops[hops.len() - trusted_proxy_count - 1].parse().ok()
}

/// Client address used as the limiter key. `X-Forwarded-For` is only read
/// when proxies are trusted; otherwise, or when the chain is short or
/// malformed, the peer IP is used.
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    trusted_proxy_count: usize,
) -> Option<String> {
    let forwarded = (trusted_proxy_count > 0)
        .then(|| headers.get(FORWARDED_FOR_HEADER))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| forwarded_client(v, trusted_proxy_count));

    forwarded
        .or_else(|| peer.map(|ip| ip.0.ip()))
        .map(|ip| ip.to_string())
}

pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        state.trusted_proxy_count,
    );

    if let Some(key) = key {
        if state.limiter.check_key(&key).is_err() {
            tracing::warn!(client = %key, "rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse {
                    error: "Too many requests, please slow down.".to_string(),
                    details: None,
                    file_url: None,
                }),
            )
                .into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod cfg_tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 4000)))
    }

    fn with_forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    pub fn test_client_key_extraction() {
        let headers = HeaderMap::new();
        assert_eq!(client_key(&headers, Some(&peer()), 0).as_deref(), Some("192.0.2.10"));
        assert_eq!(client_key(&headers, None, 0), None);
        assert_eq!(client_key(&headers, Some(&peer()), 1).as_deref(), Some("192.0.2.10"));
    }

    #[test]
    fn forwarded_header_is_ignored_without_trusted_proxies() {
        let headers = with_forwarded("203.0.113.7");
        assert_eq!(client_key(&headers, Some(&peer()), 0).as_deref(), Some("192.0.2.10"));
    }

    #[test]
    fn hop_before_the_trusted_proxies_is_the_client() {
        // spoofed by the client, real client, trusted proxy
        let headers = with_forwarded("10.9.9.9, 203.0.113.7, 10.0.0.1");
        assert_eq!(client_key(&headers, Some(&peer()), 1).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_key(&headers, Some(&peer()), 2).as_deref(), Some("10.9.9.9"));
    }

    #[test]
    fn short_or_malformed_chains_fall_back_to_the_peer() {
        let short = with_forwarded("203.0.113.7");
        assert_eq!(client_key(&short, Some(&peer()), 1).as_deref(), Some("192.0.2.10"));

        let garbage = with_forwarded("not-an-ip, 10.0.0.1");
        assert_eq!(client_key(&garbage, Some(&peer()), 1).as_deref(), Some("192.0.2.10"));

        let blank = with_forwarded(" ");
        assert_eq!(client_key(&blank, Some(&peer()), 1).as_deref(), Some("192.0.2.10"));
    }

    #[test]
    fn ipv6_hops_are_accepted() {
        let headers = with_forwarded("2001:db8::1, 10.0.0.1");
        assert_eq!(client_key(&headers, None, 1).as_deref(), Some("2001:db8::1"));
    }
}
