//! ContactDeck CLI - operator tools for the contacts dashboard.
//!
//! # Usage
//!
//! ```bash
//! # Mint a widget session token for a user
//! cdk token --user-id user_123 --user-name "Ann Example" --user-email a@x.com
//!
//! # List contacts through the configured connection
//! cdk contacts list --user-id user_123
//!
//! # Create a contact
//! cdk contacts create --user-id user_123 \
//!     --full-name "Bo" --email bo@x.com --phone 555 --company Acme --pronoun he/him
//! ```
//!
//! # Commands
//!
//! - `token` - Mint a session token
//! - `contacts list` - List contacts, newest first
//! - `contacts create` - Create a contact through the optimistic cache

#![forbid(unsafe_code)]

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cdk")]
#[command(author, version, about = "ContactDeck CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a widget session token
    Token {
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Work with contacts on the configured connection
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },
}

/// The user to act as.
#[derive(Args)]
struct IdentityArgs {
    /// Subject id
    #[arg(long)]
    user_id: String,

    /// Display name
    #[arg(long, default_value = "")]
    user_name: String,

    /// Email address (repeatable)
    #[arg(long = "user-email")]
    user_emails: Vec<String>,
}

#[derive(Subcommand)]
enum ContactsAction {
    /// List contacts, newest first
    List {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Print the raw view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a contact
    Create {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Contact's full name
        #[arg(long)]
        full_name: String,

        /// Contact's email address
        #[arg(long)]
        email: String,

        /// Contact's phone number
        #[arg(long)]
        phone: String,

        /// Contact's company
        #[arg(long)]
        company: String,

        /// Pronoun tag (repeatable)
        #[arg(long = "pronoun", required = true)]
        pronouns: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contactdeck=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Token { identity } => {
            commands::token::mint(&identity.into_claims()?)?;
        }
        Commands::Contacts { action } => match action {
            ContactsAction::List { identity, json } => {
                commands::contacts::list(&identity.into_claims()?, json).await?;
            }
            ContactsAction::Create {
                identity,
                full_name,
                email,
                phone,
                company,
                pronouns,
            } => {
                let input = contactdeck_core::NewContactInput {
                    full_name,
                    email,
                    phone,
                    company_name: company,
                    pronouns,
                };
                commands::contacts::create(&identity.into_claims()?, input).await?;
            }
        },
    }
    Ok(())
}

impl IdentityArgs {
    fn into_claims(self) -> Result<contactdeck_core::IdentityClaims, commands::CliError> {
        let emails = self
            .user_emails
            .iter()
            .map(|raw| {
                contactdeck_core::Email::parse(raw)
                    .map_err(|e| commands::CliError::InvalidEmail(raw.clone(), e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(contactdeck_core::IdentityClaims::new(
            contactdeck_core::SubjectId::new(self.user_id),
            self.user_name,
            emails,
        ))
    }
}
