//! ContactDeck Core - Shared contact types.
//!
//! This crate provides the types shared by the ContactDeck components:
//! - `contactdeck` - Dashboard server and optimistic record cache
//! - `contactdeck-cli` - Operator command-line tools
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no clocks beyond what callers pass in. This keeps it lightweight
//! and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for record ids, emails, identity claims and
//!   contact records
//! - [`normalize`] - Mapping from the connector's record shape to [`DomainRecord`]

#![forbid(unsafe_code)]

pub mod normalize;
pub mod types;

pub use normalize::normalize;
pub use types::*;
