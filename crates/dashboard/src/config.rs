//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WORKSPACE_KEY` - Integration platform workspace key (token issuer)
//! - `WORKSPACE_SECRET` - Integration platform workspace secret (token signing key)
//!
//! ## Optional
//! - `DASHBOARD_HOST` - Bind address (default: 127.0.0.1)
//! - `DASHBOARD_PORT` - Listen port (default: 3000)
//! - `DASHBOARD_BASE_URL` - Public URL for the dashboard (default: <http://localhost:3000>)
//! - `AUTH_SIGN_IN_URL` - Where signed-out browsers are sent (default: /sign-in)
//! - `INTEGRATION_API_URL` - Platform API base URL (default: <https://api.integration.app>)
//! - `INTEGRATION_CONNECTION` - Connection the contacts live behind (default: hubspot)
//! - `INTEGRATION_LIST_ACTION` - Action listing contacts (default: list-data-records)
//! - `INTEGRATION_CREATE_ACTION` - Action creating a contact (default: create-contact)
//! - `INTEGRATION_TIMEOUT_SECS` - Per-call timeout (default: 30)
//! - `TOKEN_TTL_SECS` - Adds an `exp` claim to minted tokens (default: unset, no expiry claim)
//! - `CACHE_IDLE_SECS` - Idle time before a user's record cache is dropped (default: 1800)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_URL: &str = "https://api.integration.app";
const DEFAULT_CONNECTION: &str = "hubspot";
const DEFAULT_LIST_ACTION: &str = "list-data-records";
const DEFAULT_CREATE_ACTION: &str = "create-contact";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Dashboard application configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the dashboard
    pub base_url: String,
    /// Redirect target for requests without an identity
    pub sign_in_url: String,
    /// Integration platform configuration
    pub integration: IntegrationConfig,
    /// Idle time after which a user's record cache is torn down
    pub cache_idle: Duration,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Integration platform configuration.
///
/// Implements `Debug` manually to redact the workspace secret.
#[derive(Clone)]
pub struct IntegrationConfig {
    /// Platform API base URL
    pub api_url: String,
    /// Workspace key, stamped as the issuer of every minted token
    pub workspace_key: String,
    /// Workspace secret, the HS256 signing key for minted tokens
    pub workspace_secret: SecretString,
    /// Connection the contact records live behind
    pub connection: String,
    /// Action key listing records
    pub list_action: String,
    /// Action key creating a record
    pub create_action: String,
    /// Per-call timeout
    pub timeout: Duration,
    /// Lifetime of minted tokens, `None` for no `exp` claim
    pub token_ttl: Option<Duration>,
}

impl std::fmt::Debug for IntegrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationConfig")
            .field("api_url", &self.api_url)
            .field("workspace_key", &self.workspace_key)
            .field("workspace_secret", &"[REDACTED]")
            .field("connection", &self.connection)
            .field("list_action", &self.list_action)
            .field("create_action", &self.create_action)
            .field("timeout", &self.timeout)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the signing secret fails validation (length, placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("DASHBOARD_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("DASHBOARD_HOST".to_string(), e.to_string()))?;
        let port = parse_env_or_default("DASHBOARD_PORT", 3000_u16)?;
        let base_url = get_env_or_default("DASHBOARD_BASE_URL", "http://localhost:3000");
        let sign_in_url = get_env_or_default("AUTH_SIGN_IN_URL", "/sign-in");
        let integration = IntegrationConfig::from_env()?;
        let cache_idle = Duration::from_secs(parse_env_or_default("CACHE_IDLE_SECS", 1800_u64)?);
        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            sign_in_url,
            integration,
            cache_idle,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the integration platform configuration.
    #[must_use]
    pub const fn integration(&self) -> &IntegrationConfig {
        &self.integration
    }

    /// Local settings with a fixed workspace key and secret, for tests.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn for_tests(workspace_key: &str, workspace_secret: &str) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost".to_string(),
            sign_in_url: "/sign-in".to_string(),
            integration: IntegrationConfig {
                api_url: DEFAULT_API_URL.to_string(),
                workspace_key: workspace_key.to_string(),
                workspace_secret: SecretString::from(workspace_secret),
                connection: DEFAULT_CONNECTION.to_string(),
                list_action: DEFAULT_LIST_ACTION.to_string(),
                create_action: DEFAULT_CREATE_ACTION.to_string(),
                timeout: Duration::from_secs(5),
                token_ttl: None,
            },
            cache_idle: Duration::from_secs(60),
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

impl IntegrationConfig {
    /// Load the integration platform settings on their own.
    ///
    /// Used by the server and by the CLI, which needs no listener settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the workspace key or secret is missing or the
    /// secret is weak.
    pub fn from_env() -> Result<Self, ConfigError> {
        let workspace_key = get_required_env("WORKSPACE_KEY")?;
        if workspace_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "WORKSPACE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let workspace_secret = get_validated_secret("WORKSPACE_SECRET")?;
        validate_signing_secret(&workspace_secret, "WORKSPACE_SECRET")?;

        let token_ttl = get_optional_env("TOKEN_TTL_SECS")
            .map(|s| {
                s.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("TOKEN_TTL_SECS".to_string(), e.to_string())
                })
            })
            .transpose()?
            .map(Duration::from_secs);

        let api_url = get_env_or_default("INTEGRATION_API_URL", DEFAULT_API_URL);
        url::Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("INTEGRATION_API_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_url,
            workspace_key,
            workspace_secret,
            connection: get_env_or_default("INTEGRATION_CONNECTION", DEFAULT_CONNECTION),
            list_action: get_env_or_default("INTEGRATION_LIST_ACTION", DEFAULT_LIST_ACTION),
            create_action: get_env_or_default("INTEGRATION_CREATE_ACTION", DEFAULT_CREATE_ACTION),
            timeout: Duration::from_secs(parse_env_or_default("INTEGRATION_TIMEOUT_SECS", 30_u64)?),
            token_ttl,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| {
        value
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_signing_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "must not be empty".to_string(),
        ));
    }

    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_empty() {
        let result = validate_secret_strength("", "WORKSPACE_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-workspace-secret-here", "WORKSPACE_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "WORKSPACE_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "WORKSPACE_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_signing_secret_too_short() {
        let secret = SecretString::from("aB3$xY9!");
        assert!(validate_signing_secret(&secret, "WORKSPACE_SECRET").is_err());
    }

    #[test]
    fn test_parse_env_or_default_uses_default_when_unset() {
        let port: u16 = parse_env_or_default("CONTACTDECK_TEST_UNSET_PORT", 4000).unwrap();
        assert_eq!(port, 4000);
    }

    #[test]
    fn test_integration_config_debug_redacts_secret() {
        let config = IntegrationConfig {
            api_url: DEFAULT_API_URL.to_string(),
            workspace_key: "ws-key-123".to_string(),
            workspace_secret: SecretString::from("super_secret_workspace_value"),
            connection: DEFAULT_CONNECTION.to_string(),
            list_action: DEFAULT_LIST_ACTION.to_string(),
            create_action: DEFAULT_CREATE_ACTION.to_string(),
            timeout: Duration::from_secs(30),
            token_ttl: None,
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("ws-key-123"));
        assert!(debug_output.contains("hubspot"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_workspace_value"));
    }
}
