//! Action Bridge: running named actions on integration platform connections.
//!
//! The platform exposes every connector operation as
//! `run(connection, action, input?) -> { output }`. This module defines that
//! capability as the [`ActionBridge`] trait so the record cache can be driven
//! by the real HTTP client ([`IntegrationClient`]) or by a scripted stand-in
//! in tests.
//!
//! # Errors
//!
//! A failing call is either a [`PlatformError`], where the platform answered
//! with a JSON error body, or something unstructured (transport failure,
//! non-JSON body, unexpected success shape). Turning these into user-facing
//! messages is the job of [`crate::records::classify`].

mod client;
#[cfg(any(test, feature = "test-support"))]
mod scripted;

pub use client::{AuthorizedClient, IntegrationClient};
#[cfg(any(test, feature = "test-support"))]
pub use scripted::{Gate, RecordedCall, ScriptedBridge};

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

/// Errors returned by an [`ActionBridge`].
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// The platform answered with a structured error body.
    #[error("integration platform returned {}", .0.status)]
    Platform(PlatformError),

    /// The request never produced a response (connect, timeout, TLS).
    #[error("integration request failed: {0}")]
    Transport(String),

    /// A response arrived but had an unexpected shape.
    #[error("unexpected integration response: {0}")]
    UnexpectedResponse(String),
}

/// A structured error reported by the platform.
///
/// `data` is the JSON error body exactly as received. For connector failures
/// it wraps the connector's own HTTP response, e.g.
/// `{"data": {"response": {"data": {"message": "Contact already exists"}}}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformError {
    /// HTTP status of the platform response.
    pub status: u16,
    /// Decoded error body.
    pub data: Value,
}

impl PlatformError {
    /// Create a platform error.
    #[must_use]
    pub const fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    /// The error as one JSON document, `{"status": .., "data": <body>}`.
    ///
    /// Message extraction addresses paths inside this document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "data": self.data,
        })
    }
}

/// Capability to run a named action against a named connection.
///
/// Implementations return the action's `output` on success.
pub trait ActionBridge: Send + Sync {
    /// Run `action` on `connection` with an optional JSON input.
    fn run(
        &self,
        connection: &str,
        action: &str,
        input: Option<&Value>,
    ) -> impl Future<Output = Result<Value, BridgeError>> + Send;
}
