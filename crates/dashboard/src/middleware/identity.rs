//! Identity extractors.
//!
//! The dashboard runs behind an authenticating reverse proxy that forwards
//! the signed-in user as request headers. Requests without a user id are
//! unauthenticated: browser pages are redirected to the sign-in URL, API
//! calls get 401.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use contactdeck_core::{Email, IdentityClaims, SubjectId};

use crate::error::set_sentry_user;
use crate::state::AppState;

/// Subject id of the signed-in user.
pub const USER_ID_HEADER: &str = "x-auth-user-id";
/// Display name of the signed-in user.
pub const USER_NAME_HEADER: &str = "x-auth-user-name";
/// Comma-separated email addresses of the signed-in user.
pub const USER_EMAILS_HEADER: &str = "x-auth-user-emails";

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(identity): RequireUser) -> String {
///     format!("Hello, {}!", identity.full_name)
/// }
/// ```
pub struct RequireUser(pub IdentityClaims);

/// Rejection when no user is signed in.
pub enum IdentityRejection {
    /// Redirect to the sign-in page (for browser requests).
    RedirectToSignIn(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSignIn(url) => Redirect::to(&url).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = IdentityRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = identity_from_headers(&parts.headers).ok_or_else(|| {
            if parts.uri.path().starts_with("/api/") {
                IdentityRejection::Unauthorized
            } else {
                IdentityRejection::RedirectToSignIn(state.config().sign_in_url.clone())
            }
        })?;

        set_sentry_user(
            identity.id.as_str(),
            identity.primary_email().map(Email::as_str),
        );

        Ok(Self(identity))
    }
}

/// Read identity claims from proxy headers.
///
/// Returns `None` without a non-blank user id. Addresses that fail to parse
/// are skipped.
#[must_use]
pub fn identity_from_headers(headers: &HeaderMap) -> Option<IdentityClaims> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    };

    let id = header(USER_ID_HEADER).filter(|id| !id.is_empty())?;
    let name = header(USER_NAME_HEADER).unwrap_or_default();

    let emails = header(USER_EMAILS_HEADER)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .filter_map(|raw| match Email::parse(raw) {
            Ok(email) => Some(email),
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable identity email");
                None
            }
        })
        .collect();

    Some(IdentityClaims::new(SubjectId::new(id), name, emails))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_full_identity() {
        let identity = identity_from_headers(&headers(&[
            (USER_ID_HEADER, "user_123"),
            (USER_NAME_HEADER, "Ann Example"),
            (USER_EMAILS_HEADER, "a@x.com, ann@acme.com"),
        ]));

        let Some(identity) = identity else {
            panic!("expected identity");
        };
        assert_eq!(identity.id.as_str(), "user_123");
        assert_eq!(identity.full_name, "Ann Example");
        assert_eq!(
            identity
                .email_addresses
                .iter()
                .map(Email::as_str)
                .collect::<Vec<_>>(),
            ["a@x.com", "ann@acme.com"]
        );
    }

    #[test]
    fn test_missing_or_blank_id_is_unauthenticated() {
        assert!(identity_from_headers(&headers(&[])).is_none());
        assert!(identity_from_headers(&headers(&[(USER_ID_HEADER, "  ")])).is_none());
        assert!(
            identity_from_headers(&headers(&[(USER_NAME_HEADER, "Ann")])).is_none()
        );
    }

    #[test]
    fn test_optional_fields_default_and_bad_emails_are_skipped() {
        let identity = identity_from_headers(&headers(&[
            (USER_ID_HEADER, "user_123"),
            (USER_EMAILS_HEADER, "not-an-email,,a@x.com"),
        ]));

        let Some(identity) = identity else {
            panic!("expected identity");
        };
        assert_eq!(identity.full_name, "");
        assert_eq!(identity.email_addresses.len(), 1);
        assert_eq!(identity.email_addresses[0].as_str(), "a@x.com");
    }
}
