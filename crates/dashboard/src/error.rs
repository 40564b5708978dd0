//! Unified error handling for the dashboard.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::records::SyncError;
use crate::token::TokenError;

/// Application-level error type for the dashboard.
#[derive(Debug, Error)]
pub enum AppError {
    /// Record synchronization failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Minting a session token failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Request body could not be read.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Token(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Dashboard request error"
            );
        }

        match self {
            Self::Sync(SyncError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "Invalid contact", "fields": errors })),
            )
                .into_response(),
            Self::Sync(err @ (SyncError::MutationInFlight | SyncError::NotReady)) => {
                (StatusCode::CONFLICT, Json(json!({ "error": err.to_string() }))).into_response()
            }
            // Classified messages are already safe to show.
            Self::Sync(SyncError::Remote(classified)) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": classified.message, "kind": classified.kind })),
            )
                .into_response(),
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            // Don't expose internal error details to clients
            Self::Token(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response(),
        }
    }
}

/// Set the Sentry user context for the signed-in user.
pub fn set_sentry_user(subject_id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(subject_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use contactdeck_core::NewContactInput;

    use super::*;
    use crate::records::{ClassifiedError, ErrorKind};

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        let validation = NewContactInput::default()
            .validate()
            .err()
            .map(SyncError::Validation);

        if let Some(err) = validation {
            assert_eq!(status(err.into()), StatusCode::UNPROCESSABLE_ENTITY);
        }
        assert_eq!(
            status(SyncError::MutationInFlight.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(status(SyncError::NotReady.into()), StatusCode::CONFLICT);
        assert_eq!(
            status(SyncError::Remote(ClassifiedError::unknown()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(TokenError::MissingSecret.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(AppError::BadRequest("bad json".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_remote_error_display_is_the_classified_message() {
        let err = AppError::from(SyncError::Remote(ClassifiedError {
            kind: ErrorKind::Platform,
            message: "Contact already exists".to_string(),
        }));

        assert_eq!(err.to_string(), "Contact already exists");
    }
}
