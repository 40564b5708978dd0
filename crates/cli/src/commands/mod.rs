//! CLI command implementations.

pub mod contacts;
pub mod token;

use contactdeck::bridge::BridgeError;
use contactdeck::config::{ConfigError, IntegrationConfig};
use contactdeck::records::SyncError;
use contactdeck::token::TokenError;
use contactdeck_core::EmailError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A token could not be minted.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// The platform client could not be built.
    #[error("Integration client error: {0}")]
    Bridge(#[from] BridgeError),

    /// A list or create failed.
    #[error("{0}")]
    Sync(#[from] SyncError),

    /// An identity email did not parse.
    #[error("Invalid email {0}: {1}")]
    InvalidEmail(String, EmailError),
}

/// Load the integration settings, honoring a `.env` file.
fn load_config() -> Result<IntegrationConfig, CliError> {
    dotenvy::dotenv().ok();
    Ok(IntegrationConfig::from_env()?)
}
