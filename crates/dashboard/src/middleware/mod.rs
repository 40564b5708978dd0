//! HTTP middleware for the dashboard.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (proxy-supplied or generated)
//! 4. `Cache-Control: no-store` on routes that return tokens or user data
//!
//! Identity is not a layer: handlers that need a user take the
//! [`RequireUser`] extractor.

pub mod identity;
pub mod request_id;

pub use identity::{RequireUser, identity_from_headers};
pub use request_id::request_id_middleware;
