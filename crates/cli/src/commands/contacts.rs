//! Contact commands.
//!
//! Both commands run through the same [`RecordCache`] the dashboard uses, so
//! `create` validates, inserts optimistically and reconciles exactly as a
//! browser session would.
//!
//! # Environment Variables
//!
//! - `WORKSPACE_KEY`, `WORKSPACE_SECRET` - token issuer and signing key
//! - `INTEGRATION_*` - platform URL, connection and action keys

use contactdeck::bridge::{AuthorizedClient, IntegrationClient};
use contactdeck::records::{CacheView, RecordCache, ResourceBinding, SyncError};
use contactdeck::token::TokenIssuer;
use contactdeck_core::{IdentityClaims, NewContactInput};

use super::{CliError, load_config};

/// A loaded cache plus the bridge it was loaded through.
struct Session {
    cache: RecordCache,
    bridge: AuthorizedClient,
}

async fn open(identity: &IdentityClaims) -> Result<Session, CliError> {
    let config = load_config()?;
    let issuer = TokenIssuer::from_config(&config)?;
    let client = IntegrationClient::new(&config)?;
    let bridge = client.authorized(issuer.mint(identity)?);

    let cache = RecordCache::new(ResourceBinding::from_config(&config));
    cache.fetch(&bridge).await?;

    Ok(Session { cache, bridge })
}

/// List contacts, newest first.
pub async fn list(identity: &IdentityClaims, json: bool) -> Result<(), CliError> {
    let session = open(identity).await?;
    print_view(&session.cache.view().newest_first(), json);
    Ok(())
}

/// Create a contact and print the reconciled list.
pub async fn create(identity: &IdentityClaims, input: NewContactInput) -> Result<(), CliError> {
    let session = open(identity).await?;

    match session.cache.create(&session.bridge, input).await {
        Ok(view) => {
            tracing::info!(count = view.records.len(), "Contact created");
            print_view(&view.newest_first(), false);
            Ok(())
        }
        Err(SyncError::Validation(errors)) => {
            for field in errors.fields() {
                tracing::error!(field = field.field, "{}", field.message);
            }
            Err(SyncError::Validation(errors).into())
        }
        Err(e) => Err(e.into()),
    }
}

#[allow(clippy::print_stdout)]
fn print_view(view: &CacheView, json: bool) {
    if json {
        match serde_json::to_string_pretty(view) {
            Ok(body) => println!("{body}"),
            Err(e) => tracing::error!("Failed to encode view: {e}"),
        }
        return;
    }

    if let Some(error) = &view.error {
        println!("warning: {error}");
    }

    for record in &view.records {
        let created = record
            .created_at
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d").to_string());
        println!(
            "{:<12} {:<24} {:<28} {:<16} {:<20} {:<10} {}",
            record.id.as_str(), record.full_name, record.email, record.phone, record.company_name,
            record.pronouns, created
        );
    }

    println!("{} contact(s)", view.records.len());
}
