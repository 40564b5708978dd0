//! Identity of the signed-in user.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::SubjectId;

/// Identity claims supplied by the authenticated-session provider.
///
/// Built per request and handed to the token issuer; nothing holds on to a
/// value of this type beyond a single mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    /// Provider-assigned subject id.
    pub id: SubjectId,
    /// Display name, empty when the provider has none.
    pub full_name: String,
    /// Every address the provider knows for this user.
    pub email_addresses: Vec<Email>,
}

impl IdentityClaims {
    /// Create identity claims.
    #[must_use]
    pub fn new(id: SubjectId, full_name: impl Into<String>, email_addresses: Vec<Email>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            email_addresses,
        }
    }

    /// The address to show for this user, if any.
    #[must_use]
    pub fn primary_email(&self) -> Option<&Email> {
        self.email_addresses.first()
    }
}
