//! Secret Manager REST client.

use super::types::{SecretAccessError, SecretReference};
use crate::config::{
    ConfigEnvironment, ACCESS_TOKEN_ENV, DEFAULT_METADATA_ENDPOINT,
    DEFAULT_SECRET_MANAGER_ENDPOINT, DEFAULT_SECRET_MANAGER_TIMEOUT_SECS,
    METADATA_ENDPOINT_PROPERTY, SECRET_MANAGER_ENDPOINT_PROPERTY, SECRET_MANAGER_TIMEOUT_PROPERTY,
};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Path of the default service account token on the metadata server.
const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Access to secret payloads.
#[async_trait]
pub trait SecretManagerClient: Send + Sync {
    /// Fetch the raw payload of `reference`.
    async fn access_secret_version(
        &self,
        reference: &SecretReference,
    ) -> Result<Vec<u8>, SecretAccessError>;
}

/// Connection settings for [`GcpSecretManagerClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoint: String,
    pub metadata_endpoint: String,
    /// Bearer token to use instead of asking the metadata server.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SECRET_MANAGER_ENDPOINT.to_string(),
            metadata_endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_SECRET_MANAGER_TIMEOUT_SECS),
        }
    }
}

impl ClientSettings {
    pub fn from_environment(environment: &ConfigEnvironment) -> Self {
        let defaults = Self::default();
        Self {
            endpoint: environment
                .get_non_empty(SECRET_MANAGER_ENDPOINT_PROPERTY)
                .map(String::from)
                .unwrap_or(defaults.endpoint),
            metadata_endpoint: environment
                .get_non_empty(METADATA_ENDPOINT_PROPERTY)
                .map(String::from)
                .unwrap_or(defaults.metadata_endpoint),
            access_token: environment.env().get(ACCESS_TOKEN_ENV).map(String::from),
            timeout: Duration::from_secs(
                environment.get_u64(SECRET_MANAGER_TIMEOUT_PROPERTY, DEFAULT_SECRET_MANAGER_TIMEOUT_SECS),
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessSecretVersionResponse {
    #[serde(default)]
    payload: Option<SecretPayload>,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Secret Manager v1 REST API client.
///
/// The HTTP connection pool is created per call and dropped when the call
/// returns; nothing outlives the fetch.
#[derive(Debug, Clone)]
pub struct GcpSecretManagerClient {
    settings: ClientSettings,
}

impl GcpSecretManagerClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub fn from_environment(environment: &ConfigEnvironment) -> Self {
        Self::new(ClientSettings::from_environment(environment))
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn map_transport(&self, err: reqwest::Error) -> SecretAccessError {
        if err.is_timeout() {
            SecretAccessError::Timeout(self.settings.timeout)
        } else {
            SecretAccessError::Transport(err.to_string())
        }
    }

    async fn access_token(&self, http: &reqwest::Client) -> Result<String, SecretAccessError> {
        if let Some(token) = &self.settings.access_token {
            return Ok(token.clone());
        }

        let url = format!(
            "{}{}",
            self.settings.metadata_endpoint.trim_end_matches('/'),
            METADATA_TOKEN_PATH
        );
        debug!("Requesting access token from metadata server");

        let resp = http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SecretAccessError::Credentials(format!("metadata server unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(SecretAccessError::Credentials(format!(
                "metadata server returned {}",
                resp.status()
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SecretAccessError::Credentials(format!("invalid token response: {e}")))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl SecretManagerClient for GcpSecretManagerClient {
    async fn access_secret_version(
        &self,
        reference: &SecretReference,
    ) -> Result<Vec<u8>, SecretAccessError> {
        let http = reqwest::Client::builder()
            .timeout(self.settings.timeout)
            .build()
            .map_err(|e| SecretAccessError::Transport(e.to_string()))?;

        let token = self.access_token(&http).await?;
        let url = format!(
            "{}/v1/{}:access",
            self.settings.endpoint.trim_end_matches('/'),
            reference.resource_name()
        );
        debug!("Accessing secret version: {}", reference);

        let resp = http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 => SecretAccessError::NotFound,
                403 => SecretAccessError::PermissionDenied,
                401 => SecretAccessError::Unauthenticated,
                code => SecretAccessError::Status {
                    code,
                    message: error_message(&body),
                },
            });
        }

        let body: AccessSecretVersionResponse = resp
            .json()
            .await
            .map_err(|e| SecretAccessError::MalformedResponse(e.to_string()))?;

        let data = body.payload.map(|p| p.data).unwrap_or_default();
        base64::engine::general_purpose::STANDARD
            .decode(data.as_bytes())
            .map_err(|e| SecretAccessError::MalformedResponse(format!("payload is not base64: {e}")))
    }
}

/// Pull the message out of a Google API error envelope, or return the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
