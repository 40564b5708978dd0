//! Session tokens for the embedded integration widget.
//!
//! A token asserts who the signed-in user is to the integration platform. It
//! is an HS256 JWT signed with the workspace secret and issued under the
//! workspace key. Tokens are minted per page load (and per server-side
//! platform call) and never stored.
//!
//! Payload shape:
//!
//! ```json
//! {
//!   "id": "user_123",
//!   "name": "Ann Example",
//!   "fields": { "emails": ["a@x.com"] },
//!   "iss": "<workspace key>",
//!   "iat": 1704067200
//! }
//! ```
//!
//! Emails sit under `fields` so the widget can treat identity as an open
//! field bag. `exp` is only present when a token TTL is configured.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use contactdeck_core::IdentityClaims;

use crate::config::IntegrationConfig;

/// Errors that can occur when building an issuer or minting a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The signing secret is empty.
    #[error("token signing secret is not configured")]
    MissingSecret,

    /// The issuer id is empty.
    #[error("token issuer is not configured")]
    MissingIssuer,

    /// Token lifetime does not fit in a timestamp.
    #[error("token lifetime out of range")]
    LifetimeOutOfRange,

    /// The JWT library rejected the claims or key.
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Email addresses nested under the `fields` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFields {
    pub emails: Vec<String>,
}

/// Claims carried by a widget session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetClaims {
    /// Subject id.
    pub id: String,
    /// Display name.
    pub name: String,
    pub fields: IdentityFields,
    /// Workspace key.
    pub iss: String,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds), only with a configured TTL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// A minted, signed session token.
///
/// `Debug` never prints the token. Read it with [`SessionToken::expose`] only
/// at the point it leaves the process.
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    /// The encoded JWT.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Mints session tokens for the integration widget.
///
/// Holds the signing key for the life of the process. Implements `Debug`
/// manually so the key never reaches logs.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    issuer: String,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// Create an issuer from a signing secret and issuer id.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MissingSecret`] or [`TokenError::MissingIssuer`]
    /// when either is empty. Both are configuration errors and should stop
    /// the process at start-up.
    pub fn new(
        signing_secret: &SecretString,
        issuer: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Result<Self, TokenError> {
        let secret = signing_secret.expose_secret();
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let issuer = issuer.into();
        if issuer.trim().is_empty() {
            return Err(TokenError::MissingIssuer);
        }

        Ok(Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            issuer,
            ttl,
        })
    }

    /// Create an issuer from the integration platform configuration.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::new`].
    pub fn from_config(config: &IntegrationConfig) -> Result<Self, TokenError> {
        Self::new(
            &config.workspace_secret,
            config.workspace_key.clone(),
            config.token_ttl,
        )
    }

    /// The issuer id stamped into every token.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Mint a token for `identity`, issued now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn mint(&self, identity: &IdentityClaims) -> Result<SessionToken, TokenError> {
        self.mint_at(identity, Utc::now())
    }

    /// Mint a token for `identity` with an explicit issue time.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails, or
    /// [`TokenError::LifetimeOutOfRange`] if the configured TTL overflows.
    #[instrument(skip_all, fields(subject = %identity.id))]
    pub fn mint_at(
        &self,
        identity: &IdentityClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<SessionToken, TokenError> {
        let iat = issued_at.timestamp();
        let exp = self
            .ttl
            .map(|ttl| {
                i64::try_from(ttl.as_secs())
                    .ok()
                    .and_then(|secs| iat.checked_add(secs))
                    .ok_or(TokenError::LifetimeOutOfRange)
            })
            .transpose()?;

        let claims = WidgetClaims {
            id: identity.id.to_string(),
            name: identity.full_name.clone(),
            fields: IdentityFields {
                emails: identity
                    .email_addresses
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
            iss: self.issuer.clone(),
            iat,
            exp,
        };

        let encoded = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;

        debug!(has_expiry = exp.is_some(), "Minted widget session token");

        Ok(SessionToken(SecretString::from(encoded)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use contactdeck_core::{Email, SubjectId};
    use jsonwebtoken::{DecodingKey, Validation};

    use super::*;

    const SECRET: &str = "kT9#vQ2$mZ7!pL4@wR8^bN1&xC6*hJ3%";

    fn identity() -> IdentityClaims {
        IdentityClaims::new(
            SubjectId::new("user_123"),
            "Ann Example",
            vec![
                Email::parse("a@x.com").unwrap(),
                Email::parse("ann@acme.com").unwrap(),
            ],
        )
    }

    fn decode(token: &SessionToken, secret: &str, issuer: &str) -> WidgetClaims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.set_issuer(&[issuer]);

        jsonwebtoken::decode::<WidgetClaims>(
            token.expose(),
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .unwrap()
        .claims
    }

    #[test]
    fn test_rejects_empty_secret() {
        let result = TokenIssuer::new(&SecretString::from(""), "ws-key", None);
        assert!(matches!(result, Err(TokenError::MissingSecret)));
    }

    #[test]
    fn test_rejects_empty_issuer() {
        let result = TokenIssuer::new(&SecretString::from(SECRET), " ", None);
        assert!(matches!(result, Err(TokenError::MissingIssuer)));
    }

    #[test]
    fn test_minted_claims() {
        let issuer = TokenIssuer::new(&SecretString::from(SECRET), "ws-key", None).unwrap();
        let issued_at: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();

        let token = issuer.mint_at(&identity(), issued_at).unwrap();
        let claims = decode(&token, SECRET, "ws-key");

        assert_eq!(claims.id, "user_123");
        assert_eq!(claims.name, "Ann Example");
        assert_eq!(claims.fields.emails, ["a@x.com", "ann@acme.com"]);
        assert_eq!(claims.iss, "ws-key");
        assert_eq!(claims.iat, issued_at.timestamp());
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_emails_are_nested_under_fields() {
        let issuer = TokenIssuer::new(&SecretString::from(SECRET), "ws-key", None).unwrap();
        let token = issuer.mint(&identity()).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let raw = jsonwebtoken::decode::<serde_json::Value>(
            token.expose(),
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(raw["fields"]["emails"][0], "a@x.com");
        assert!(raw.get("emails").is_none());
        assert!(raw.get("exp").is_none());
    }

    #[test]
    fn test_ttl_sets_expiry() {
        let issuer = TokenIssuer::new(
            &SecretString::from(SECRET),
            "ws-key",
            Some(Duration::from_secs(600)),
        )
        .unwrap();
        let issued_at: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();

        let claims = decode(&issuer.mint_at(&identity(), issued_at).unwrap(), SECRET, "ws-key");

        assert_eq!(claims.exp, Some(issued_at.timestamp() + 600));
    }

    #[test]
    fn test_wrong_secret_fails_verification() {
        let issuer = TokenIssuer::new(&SecretString::from(SECRET), "ws-key", None).unwrap();
        let token = issuer.mint(&identity()).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let result = jsonwebtoken::decode::<WidgetClaims>(
            token.expose(),
            &DecodingKey::from_secret(b"a-different-signing-key-entirely"),
            &validation,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_each_mint_is_fresh() {
        let issuer = TokenIssuer::new(&SecretString::from(SECRET), "ws-key", None).unwrap();
        let first = issuer
            .mint_at(&identity(), "2024-01-01T00:00:00Z".parse().unwrap())
            .unwrap();
        let second = issuer
            .mint_at(&identity(), "2024-01-01T00:00:01Z".parse().unwrap())
            .unwrap();

        assert_ne!(first.expose(), second.expose());
    }

    #[test]
    fn test_debug_redacts() {
        let issuer = TokenIssuer::new(&SecretString::from(SECRET), "ws-key", None).unwrap();
        let token = issuer.mint(&identity()).unwrap();

        assert!(!format!("{issuer:?}").contains(SECRET));
        assert!(!format!("{token:?}").contains(token.expose()));
    }
}
