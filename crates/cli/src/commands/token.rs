//! Token minting.
//!
//! Prints a widget session token for the given user, signed with
//! `WORKSPACE_SECRET` and issued under `WORKSPACE_KEY`. Useful for
//! exercising the widget handshake by hand.

use contactdeck::token::TokenIssuer;
use contactdeck_core::IdentityClaims;

use super::{CliError, load_config};

/// Mint a token and print it to stdout.
pub fn mint(identity: &IdentityClaims) -> Result<(), CliError> {
    let config = load_config()?;
    let issuer = TokenIssuer::from_config(&config)?;
    let token = issuer.mint(identity)?;

    tracing::info!(subject = %identity.id, issuer = issuer.issuer(), "Minted session token");

    #[allow(clippy::print_stdout)]
    {
        println!("{}", token.expose());
    }

    Ok(())
}
