//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Health check
//!
//! # Session
//! GET    /                     - Widget handshake ({token, connection})
//! GET    /api/session-token    - Mint a fresh token
//! DELETE /api/session          - Drop the user's record cache
//!
//! # Contacts
//! GET    /api/contacts         - Cached contacts, newest first (?refresh=true)
//! POST   /api/contacts         - Create a contact
//! ```
//!
//! Every route except `/health` needs a signed-in user and responds with
//! `Cache-Control: no-store`.

pub mod contacts;
pub mod session;

use axum::{
    Router,
    http::{HeaderValue, header::CACHE_CONTROL},
    routing::get,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    let user_routes = Router::new()
        .merge(session::router())
        .merge(contacts::router())
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new().route("/health", get(health)).merge(user_routes)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the platform.
pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::bridge::ScriptedBridge;
    use crate::config::DashboardConfig;
    use crate::middleware::identity::USER_ID_HEADER;

    fn app() -> Router {
        let config = DashboardConfig::for_tests("ws-key", "kT9#vQ2$mZ7!pL4@wR8^bN1&xC6*hJ3%");
        let state =
            AppState::with_scripted_bridge(config, Arc::new(ScriptedBridge::contacts())).unwrap();
        routes().with_state(state)
    }

    #[tokio::test]
    async fn test_health_is_public_and_cacheable() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn test_user_routes_are_not_cached() {
        let response = app()
            .oneshot(
                Request::get("/api/session-token")
                    .header(USER_ID_HEADER, "user_1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
    }
}
