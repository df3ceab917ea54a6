pub mod handlers;
pub mod rate_limiter;
pub mod types;

use crate::governor_conf::ClientRateLimiter;
use crate::server::handlers::{
    failure_as_json, method_not_allowed_handler, preflight_handler, server_status_handler,
    upload_handler,
};
use crate::server::rate_limiter::{RateLimitState, rate_limit};
use crate::server::types::AppState;
use crate::utils::constants::FORM_OVERHEAD_BYTES;
use anyhow::Error;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub const UPLOAD_ROUTE: &str = "/api/upload";

pub fn router(state: Arc<AppState>, limiter: Arc<ClientRateLimiter>) -> Result<Router, Error> {
    let config = &state.config;

    let cors = CorsLayer::new()
        .allow_origin(config.allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // 408 and 413 from these two layers are rewritten by `failure_as_json`
    let timeout =
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, config.request_timeout);
    let request_body_limit =
        RequestBodyLimitLayer::new(config.max_upload_bytes + FORM_OVERHEAD_BYTES);

    let rate_limit_state = RateLimitState {
        limiter,
        trusted_proxy_count: config.trusted_proxy_count,
    };

    let router = Router::new()
        .route("/", get(server_status_handler))
        .route(
            UPLOAD_ROUTE,
            post(upload_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed_handler),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(request_body_limit)
        .layer(timeout)
        .layer(from_fn(failure_as_json))
        .layer(from_fn_with_state(rate_limit_state, rate_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}
