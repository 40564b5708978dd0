//! Contact list and create handlers.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::{Span, debug, instrument};

use contactdeck_core::NewContactInput;

use crate::{
    error::AppError,
    middleware::RequireUser,
    records::{CacheView, Phase},
    state::AppState,
};

/// Build the contacts router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/contacts", get(list_contacts).post(create_contact))
}

/// Query parameters for the contact list.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Re-fetch from the connector even if the cache is populated.
    #[serde(default)]
    pub refresh: bool,
}

/// Current contacts, newest first.
///
/// Reads load the list until one load has succeeded. A failed load is not an
/// HTTP error: the view's `error` carries the message and the previous
/// records stay in place.
///
/// # Errors
///
/// Returns an error if a token cannot be minted for the load.
#[instrument(skip_all, fields(subject = tracing::field::Empty, refresh = tracing::field::Empty))]
pub async fn list_contacts(
    RequireUser(identity): RequireUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CacheView>, AppError> {
    Span::current()
        .record("subject", identity.id.as_str())
        .record("refresh", params.refresh);

    let cache = state.cache_for(&identity.id).await;

    if params.refresh || cache.phase() == Phase::Idle {
        let bridge = state.bridge_for(&identity)?;
        if let Err(err) = cache.fetch(&bridge).await {
            debug!(error = %err, "Contact list load failed");
        }
    }

    Ok(Json(cache.view().newest_first()))
}

/// Create a contact and return the reconciled list.
///
/// # Errors
///
/// - 400 if the body is not valid JSON
/// - 422 with field messages if the contact is invalid
/// - 409 if another create is still pending
/// - 502 with a displayable message if the connector rejects it, or if the
///   first load of the list fails
#[instrument(skip_all, fields(subject = tracing::field::Empty))]
pub async fn create_contact(
    RequireUser(identity): RequireUser,
    State(state): State<AppState>,
    body: Result<Json<NewContactInput>, JsonRejection>,
) -> Result<(StatusCode, Json<CacheView>), AppError> {
    Span::current().record("subject", identity.id.as_str());

    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let cache = state.cache_for(&identity.id).await;
    let bridge = state.bridge_for(&identity)?;

    // Creating from a fresh session: load the list first so there is a
    // snapshot to roll back to.
    if cache.phase() == Phase::Idle {
        cache.fetch(&bridge).await?;
    }

    let view = cache.create(&bridge, input).await?;

    Ok((StatusCode::CREATED, Json(view.newest_first())))
}
