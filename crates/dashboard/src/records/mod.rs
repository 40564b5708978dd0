//! Optimistic record synchronization.
//!
//! A [`RecordCache`] keeps the last-known list of contact records for one
//! user and resource, driven through an [`ActionBridge`]:
//!
//! ```text
//! Idle ──fetch──▶ Loading ──▶ Ready ──create──▶ OptimisticPending
//!                               ▲                      │
//!                               └── success/rollback ──┘
//! ```
//!
//! At most one create is outstanding per cache. List responses that were
//! superseded by a newer request, or that land while a create is pending,
//! are discarded.
//!
//! [`ActionBridge`]: crate::bridge::ActionBridge

mod cache;
pub mod classify;

pub use cache::RecordCache;
pub use classify::{ClassifiedError, ErrorKind, GENERIC_MESSAGE, classify};

use serde::Serialize;
use thiserror::Error;

use contactdeck_core::{DomainRecord, ValidationErrors};

use crate::config::IntegrationConfig;

/// Which connection and actions back a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBinding {
    pub connection: String,
    pub list_action: String,
    pub create_action: String,
}

impl ResourceBinding {
    /// Create a binding.
    #[must_use]
    pub fn new(
        connection: impl Into<String>,
        list_action: impl Into<String>,
        create_action: impl Into<String>,
    ) -> Self {
        Self {
            connection: connection.into(),
            list_action: list_action.into(),
            create_action: create_action.into(),
        }
    }

    /// The contacts binding from configuration.
    #[must_use]
    pub fn from_config(config: &IntegrationConfig) -> Self {
        Self::new(
            config.connection.clone(),
            config.list_action.clone(),
            config.create_action.clone(),
        )
    }
}

/// Lifecycle phase of a [`RecordCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Nothing requested yet.
    Idle,
    /// A list request is outstanding.
    Loading,
    Ready,
    /// A provisional record is visible while a create is outstanding.
    OptimisticPending,
}

/// What presentation reads: `{records, isLoading, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheView {
    pub records: Vec<DomainRecord>,
    pub is_loading: bool,
    /// Message of the last failure, cleared by the next successful fetch.
    pub error: Option<String>,
}

impl CacheView {
    /// Sort records newest first, keeping the relative order of ties.
    #[must_use]
    pub fn newest_first(mut self) -> Self {
        self.records.sort_by(DomainRecord::newest_first);
        self
    }
}

/// Errors surfaced at the cache boundary.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Create input failed validation. Nothing was sent or changed.
    #[error("invalid contact: {0}")]
    Validation(ValidationErrors),

    /// Another create is still outstanding.
    #[error("another change is still being saved")]
    MutationInFlight,

    /// No list request has succeeded yet.
    #[error("records have not been loaded yet")]
    NotReady,

    /// The remote call failed; state was rolled back first.
    #[error("{0}")]
    Remote(ClassifiedError),
}
