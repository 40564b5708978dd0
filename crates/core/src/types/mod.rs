//! Core types for ContactDeck.
//!
//! This module provides type-safe wrappers for the contact domain.

pub mod contact;
pub mod email;
pub mod id;
pub mod identity;
pub mod record;

pub use contact::{FieldError, NewContact, NewContactInput, PRONOUN_SEPARATOR, ValidationErrors};
pub use email::{Email, EmailError};
pub use id::{PROVISIONAL_PREFIX, RecordId, SubjectId};
pub use identity::IdentityClaims;
pub use record::DomainRecord;
