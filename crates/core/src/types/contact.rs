//! Contact creation input and its validation.
//!
//! Input arrives in the connector's field naming (`fullName`, `company_name`)
//! because that is what the create action accepts. Validation happens here,
//! before any network interaction, and reports every failing field at once.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::RecordId;
use super::record::DomainRecord;

/// Separator used when pronoun tags are flattened into one string.
pub const PRONOUN_SEPARATOR: &str = "/";

/// Unvalidated contact input as submitted by a form or API client.
///
/// Every field defaults so that a missing field is reported as a validation
/// error rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContactInput {
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_name: String,
    /// Pronoun tags, e.g. `["she", "her"]` or `["she/her"]`.
    #[serde(default)]
    pub pronouns: Vec<String>,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as submitted.
    pub field: &'static str,
    /// Human-readable message.
    pub message: &'static str,
}

/// All validation failures for one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// The individual field failures, in field order.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Message for a given field, if it failed.
    #[must_use]
    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

/// A contact that passed validation and may be sent to the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    pub company_name: String,
    pronouns: Vec<String>,
}

impl NewContactInput {
    /// Validate the input.
    ///
    /// Text fields are trimmed. Blank pronoun tags are dropped before the
    /// "at least one" check.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every field that failed.
    pub fn validate(self) -> Result<NewContact, ValidationErrors> {
        let mut errors = Vec::new();

        let full_name = self.full_name.trim().to_owned();
        if full_name.is_empty() {
            errors.push(FieldError {
                field: "fullName",
                message: "Full name is required",
            });
        }

        let email = Email::parse(self.email.trim());
        if email.is_err() {
            errors.push(FieldError {
                field: "email",
                message: "Invalid email address",
            });
        }

        let phone = self.phone.trim().to_owned();
        if phone.is_empty() {
            errors.push(FieldError {
                field: "phone",
                message: "Phone number is required",
            });
        }

        let company_name = self.company_name.trim().to_owned();
        if company_name.is_empty() {
            errors.push(FieldError {
                field: "company_name",
                message: "Company name is required",
            });
        }

        let pronouns: Vec<String> = self
            .pronouns
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        if pronouns.is_empty() {
            errors.push(FieldError {
                field: "pronouns",
                message: "At least one pronoun is required",
            });
        }

        match email {
            Ok(email) if errors.is_empty() => Ok(NewContact {
                full_name,
                email,
                phone,
                company_name,
                pronouns,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

impl NewContact {
    /// Pronoun tags joined into the single string the connector stores.
    #[must_use]
    pub fn joined_pronouns(&self) -> String {
        self.pronouns.join(PRONOUN_SEPARATOR)
    }

    /// Payload for the connector's create action.
    #[must_use]
    pub fn to_action_input(&self) -> serde_json::Value {
        serde_json::json!({
            "fullName": self.full_name,
            "email": self.email,
            "phone": self.phone,
            "company_name": self.company_name,
            "pronouns": self.joined_pronouns(),
        })
    }

    /// Build the optimistic stand-in shown until the remote store confirms.
    #[must_use]
    pub fn provisional_record(&self, created_at: DateTime<Utc>) -> DomainRecord {
        DomainRecord {
            id: RecordId::provisional(),
            full_name: self.full_name.clone(),
            email: self.email.to_string(),
            phone: self.phone.clone(),
            company_name: self.company_name.clone(),
            pronouns: self.joined_pronouns(),
            created_at: Some(created_at),
            uri: None,
            provisional: true,
        }
    }
}
