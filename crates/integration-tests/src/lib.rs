//! Integration tests for ContactDeck.
//!
//! Each test starts the real dashboard router on an ephemeral port, backed
//! by a [`ScriptedBridge`] in place of the integration platform, and talks
//! to it over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p contactdeck-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_api` - Health, widget handshake, token minting, identity
//! - `contacts_api` - Listing, optimistic create, rollback, per-user caches

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use contactdeck::bridge::ScriptedBridge;
use contactdeck::config::DashboardConfig;
use contactdeck::middleware::identity::{USER_EMAILS_HEADER, USER_ID_HEADER, USER_NAME_HEADER};
use contactdeck::state::AppState;
use reqwest::{Client, RequestBuilder, redirect::Policy};
use serde_json::{Value, json};

/// Issuer stamped into tokens minted during tests.
pub const WORKSPACE_KEY: &str = "ws-test-key";

/// Signing secret used during tests.
pub const WORKSPACE_SECRET: &str = "kT9#vQ2$mZ7!pL4@wR8^bN1&xC6*hJ3%";

/// A running dashboard and a client to call it.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub bridge: Arc<ScriptedBridge>,
}

impl TestContext {
    /// Start a dashboard backed by `bridge`.
    pub async fn start(bridge: ScriptedBridge) -> Self {
        let bridge = Arc::new(bridge);
        let config = DashboardConfig::for_tests(WORKSPACE_KEY, WORKSPACE_SECRET);
        let state = AppState::with_scripted_bridge(config, Arc::clone(&bridge))
            .expect("Failed to build application state");

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read test address");

        tokio::spawn(async move {
            axum::serve(listener, contactdeck::app(state))
                .await
                .expect("Test server error");
        });

        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: format!("http://{addr}"),
            bridge,
        }
    }

    /// Full URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET as the default test user.
    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        as_user(self.client.get(self.url(path)), "user_123")
    }

    /// POST JSON as the default test user.
    #[must_use]
    pub fn post_json(&self, path: &str, body: &Value) -> RequestBuilder {
        as_user(self.client.post(self.url(path)), "user_123").json(body)
    }

    /// Wait until the bridge has seen `count` calls for `action`.
    pub async fn wait_for_calls(&self, action: &str, count: usize) {
        for _ in 0..200 {
            if self.bridge.call_count(action) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("bridge never received {count} {action} call(s)");
    }
}

/// Attach the proxy identity headers for `user_id`.
#[must_use]
pub fn as_user(builder: RequestBuilder, user_id: &str) -> RequestBuilder {
    builder
        .header(USER_ID_HEADER, user_id)
        .header(USER_NAME_HEADER, "Test User")
        .header(USER_EMAILS_HEADER, "test@example.com")
}

/// The remote record used across scenarios.
#[must_use]
pub fn ann() -> Value {
    json!({
        "id": "1",
        "name": "Ann",
        "fields": {
            "email": "a@x.com",
            "phone": "555",
            "company": "Acme",
            "salutation": "she/her"
        },
        "createdTime": "2024-01-01T00:00:00Z",
        "uri": "/1"
    })
}

/// A valid create request body.
#[must_use]
pub fn bo() -> Value {
    json!({
        "fullName": "Bo",
        "email": "bo@x.com",
        "phone": "555",
        "company_name": "Acme",
        "pronouns": ["he/him"]
    })
}
