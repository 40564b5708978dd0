//! ContactDeck dashboard library.
//!
//! Serves the contacts dashboard: mints session tokens for the embedded
//! integration widget and keeps a per-user, optimistically updated cache of
//! CRM contacts reached through the integration platform.
//!
//! # Security
//!
//! This crate holds the workspace signing secret. Tokens are minted per
//! request and never stored or logged. User identity is taken from headers
//! set by the authenticating reverse proxy, so the server must only be
//! reachable through that proxy.

#![forbid(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod middleware;
pub mod records;
pub mod routes;
pub mod state;
pub mod token;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the full application: routes, request tracing and Sentry layers.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
