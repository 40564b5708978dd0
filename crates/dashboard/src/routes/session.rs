//! Session routes: the widget handshake and session teardown.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use serde::Serialize;
use tracing::{Span, info, instrument};

use crate::{error::AppError, middleware::RequireUser, state::AppState};

/// Build the session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handshake))
        .route("/api/session-token", get(session_token))
        .route("/api/session", delete(end_session))
}

/// What the page hands the embedded integration widget.
#[derive(Debug, Serialize)]
pub struct Handshake {
    /// Freshly minted session token.
    pub token: String,
    /// Connection the contacts live behind.
    pub connection: String,
}

/// A freshly minted session token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Page load: mint a token for the signed-in user.
///
/// Signed-out browsers are redirected to the sign-in page by the extractor.
///
/// # Errors
///
/// Returns an error if the token cannot be signed.
#[instrument(skip_all, fields(subject = tracing::field::Empty))]
pub async fn handshake(
    RequireUser(identity): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Handshake>, AppError> {
    Span::current().record("subject", identity.id.as_str());

    let token = state.mint(&identity)?;

    Ok(Json(Handshake {
        token: token.expose().to_string(),
        connection: state.config().integration().connection.clone(),
    }))
}

/// Mint a new token, e.g. when the widget is re-mounted.
///
/// # Errors
///
/// Returns an error if the token cannot be signed.
#[instrument(skip_all, fields(subject = tracing::field::Empty))]
pub async fn session_token(
    RequireUser(identity): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, AppError> {
    Span::current().record("subject", identity.id.as_str());

    let token = state.mint(&identity)?;

    Ok(Json(TokenResponse {
        token: token.expose().to_string(),
    }))
}

/// Drop the user's record cache.
#[instrument(skip_all, fields(subject = tracing::field::Empty))]
pub async fn end_session(
    RequireUser(identity): RequireUser,
    State(state): State<AppState>,
) -> StatusCode {
    Span::current().record("subject", identity.id.as_str());

    state.end_session(&identity.id).await;
    info!("Session ended, record cache dropped");

    StatusCode::NO_CONTENT
}
