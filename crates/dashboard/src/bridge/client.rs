//! HTTP client for the integration platform's action API.
//!
//! Actions are run with
//! `POST {api_url}/connections/{connection}/actions/{action}/run`, the
//! action input as the JSON body, and a widget session token as the bearer
//! credential. Successful responses look like `{"output": ...}`.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::IntegrationConfig;
use crate::token::SessionToken;

use super::{ActionBridge, BridgeError, PlatformError};

/// Shared HTTP client for the platform API.
///
/// Cheap to clone. Holds no credentials: every call goes through an
/// [`AuthorizedClient`] built around a freshly minted token.
#[derive(Clone)]
pub struct IntegrationClient {
    inner: Arc<IntegrationClientInner>,
}

struct IntegrationClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for IntegrationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Successful action response body.
#[derive(Debug, Deserialize)]
struct ActionResponse {
    #[serde(default)]
    output: Value,
}

impl IntegrationClient {
    /// Create a new platform API client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client fails to
    /// build.
    pub fn new(config: &IntegrationConfig) -> Result<Self, BridgeError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| BridgeError::UnexpectedResponse(format!("invalid API URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::Transport(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(IntegrationClientInner { client, base_url }),
        })
    }

    /// Bind a session token, producing a bridge usable for one request.
    #[must_use]
    pub fn authorized(&self, token: SessionToken) -> AuthorizedClient {
        AuthorizedClient {
            client: self.clone(),
            token,
        }
    }

    /// Build the run URL for an action.
    fn action_url(&self, connection: &str, action: &str) -> Result<Url, BridgeError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BridgeError::UnexpectedResponse("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["connections", connection, "actions", action, "run"]);
        Ok(url)
    }
}

/// A platform client bound to one session token.
#[derive(Debug)]
pub struct AuthorizedClient {
    client: IntegrationClient,
    token: SessionToken,
}

impl ActionBridge for AuthorizedClient {
    #[instrument(skip(self, input), fields(connection = %connection, action = %action))]
    async fn run(
        &self,
        connection: &str,
        action: &str,
        input: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        let url = self.client.action_url(connection, action)?;
        let empty = Value::Object(serde_json::Map::new());

        let response = self
            .client
            .inner
            .client
            .post(url)
            .bearer_auth(self.token.expose())
            .json(input.unwrap_or(&empty))
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::Transport(e.without_url().to_string()))?;

        if status.is_success() {
            let parsed: ActionResponse = serde_json::from_str(&body)
                .map_err(|e| BridgeError::UnexpectedResponse(format!("invalid JSON: {e}")))?;
            debug!(status = %status, "Action completed");
            return Ok(parsed.output);
        }

        Err(parse_error(status, &body))
    }
}

/// Turn a non-success response into a [`BridgeError`].
fn parse_error(status: StatusCode, body: &str) -> BridgeError {
    match serde_json::from_str::<Value>(body) {
        Ok(data) if data.is_object() => {
            warn!(status = %status, "Integration platform returned an error");
            BridgeError::Platform(PlatformError::new(status.as_u16(), data))
        }
        _ => {
            warn!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "Integration platform returned a non-JSON error"
            );
            BridgeError::UnexpectedResponse(format!("HTTP {status}"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn config(api_url: &str) -> IntegrationConfig {
        IntegrationConfig {
            api_url: api_url.to_string(),
            workspace_key: "ws-key".to_string(),
            workspace_secret: SecretString::from("kT9#vQ2$mZ7!pL4@wR8^bN1&xC6*hJ3%"),
            connection: "hubspot".to_string(),
            list_action: "list-data-records".to_string(),
            create_action: "create-contact".to_string(),
            timeout: Duration::from_secs(5),
            token_ttl: None,
        }
    }

    #[test]
    fn test_action_url() {
        let client = IntegrationClient::new(&config("https://api.integration.app")).unwrap();
        let url = client.action_url("hubspot", "list-data-records");

        assert_eq!(
            url.map(String::from).ok().as_deref(),
            Some("https://api.integration.app/connections/hubspot/actions/list-data-records/run")
        );
    }

    #[test]
    fn test_action_url_keeps_base_path_and_escapes_segments() {
        let client = IntegrationClient::new(&config("https://proxy.local/platform/")).unwrap();
        let url = client.action_url("hub spot", "create/contact");

        assert_eq!(
            url.map(String::from).ok().as_deref(),
            Some("https://proxy.local/platform/connections/hub%20spot/actions/create%2Fcontact/run")
        );
    }

    #[test]
    fn test_parse_error_structured() {
        let body = r#"{"data":{"response":{"data":{"message":"Contact already exists"}}}}"#;

        match parse_error(StatusCode::BAD_REQUEST, body) {
            BridgeError::Platform(err) => {
                assert_eq!(err.status, 400);
                assert_eq!(
                    err.data["data"]["response"]["data"]["message"],
                    "Contact already exists"
                );
            }
            other => panic!("expected platform error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_unstructured() {
        assert!(matches!(
            parse_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            BridgeError::UnexpectedResponse(_)
        ));
        assert!(matches!(
            parse_error(StatusCode::INTERNAL_SERVER_ERROR, "\"oops\""),
            BridgeError::UnexpectedResponse(_)
        ));
    }
}
