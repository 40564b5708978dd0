//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;
use serde_json::Value;

use contactdeck_core::{IdentityClaims, SubjectId};

use crate::bridge::{ActionBridge, AuthorizedClient, BridgeError, IntegrationClient};
use crate::config::DashboardConfig;
use crate::records::{RecordCache, ResourceBinding};
use crate::token::{SessionToken, TokenError, TokenIssuer};

#[cfg(any(test, feature = "test-support"))]
use crate::bridge::ScriptedBridge;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("token issuer: {0}")]
    Token(#[from] TokenError),
    #[error("integration client: {0}")]
    Bridge(#[from] BridgeError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It holds the signing key and
/// the platform client, plus one [`RecordCache`] per signed-in user. Tokens
/// and identities are never stored here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    issuer: TokenIssuer,
    backend: Backend,
    binding: ResourceBinding,
    caches: Cache<SubjectId, Arc<RecordCache>>,
}

/// Where platform calls go.
enum Backend {
    Platform(IntegrationClient),
    #[cfg(any(test, feature = "test-support"))]
    Scripted(Arc<ScriptedBridge>),
}

/// An Action Bridge scoped to one request.
pub enum RequestBridge {
    Platform(AuthorizedClient),
    #[cfg(any(test, feature = "test-support"))]
    Scripted(Arc<ScriptedBridge>),
}

impl ActionBridge for RequestBridge {
    async fn run(
        &self,
        connection: &str,
        action: &str,
        input: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        match self {
            Self::Platform(client) => client.run(connection, action, input).await,
            #[cfg(any(test, feature = "test-support"))]
            Self::Scripted(bridge) => bridge.run(connection, action, input).await,
        }
    }
}

impl AppState {
    /// Create application state talking to the integration platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the token issuer or HTTP client cannot be built.
    pub fn new(config: DashboardConfig) -> Result<Self, StateError> {
        let client = IntegrationClient::new(config.integration())?;
        Self::build(config, Backend::Platform(client))
    }

    /// Create application state backed by a scripted bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if the token issuer cannot be built.
    #[cfg(any(test, feature = "test-support"))]
    pub fn with_scripted_bridge(
        config: DashboardConfig,
        bridge: Arc<ScriptedBridge>,
    ) -> Result<Self, StateError> {
        Self::build(config, Backend::Scripted(bridge))
    }

    fn build(config: DashboardConfig, backend: Backend) -> Result<Self, StateError> {
        let issuer = TokenIssuer::from_config(config.integration())?;
        let binding = ResourceBinding::from_config(config.integration());
        let caches = Cache::builder().time_to_idle(config.cache_idle).build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                issuer,
                backend,
                binding,
                caches,
            }),
        })
    }

    /// Get a reference to the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// Mint a fresh session token for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if signing fails.
    pub fn mint(&self, identity: &IdentityClaims) -> Result<SessionToken, TokenError> {
        self.inner.issuer.mint(identity)
    }

    /// Build a bridge for one request, authorized with a freshly minted token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if signing fails.
    pub fn bridge_for(&self, identity: &IdentityClaims) -> Result<RequestBridge, TokenError> {
        let token = self.mint(identity)?;
        Ok(match &self.inner.backend {
            Backend::Platform(client) => RequestBridge::Platform(client.authorized(token)),
            #[cfg(any(test, feature = "test-support"))]
            Backend::Scripted(bridge) => RequestBridge::Scripted(Arc::clone(bridge)),
        })
    }

    /// The record cache for `subject`, created on first use.
    pub async fn cache_for(&self, subject: &SubjectId) -> Arc<RecordCache> {
        let binding = self.inner.binding.clone();
        self.inner
            .caches
            .get_with_by_ref(subject, async move { Arc::new(RecordCache::new(binding)) })
            .await
    }

    /// Drop the record cache for `subject`.
    pub async fn end_session(&self, subject: &SubjectId) {
        self.inner.caches.invalidate(subject).await;
    }
}
