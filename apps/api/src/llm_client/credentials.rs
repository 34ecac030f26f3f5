//! Client-credentials exchange against the GigaChat OAuth endpoint.

use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use super::error::LlmError;
use super::masking::{mask_sensitive, MASK};
use super::retry::{retry, RetryPolicy};
use super::token_cache::{Token, TokenSource};
use super::transport::HttpExecutor;
use super::RQUID_HEADER;

/// Scope requested for personal GigaChat API access.
pub const DEFAULT_SCOPE: &str = "GIGACHAT_API_PERS";

const MILLIS_PER_SECOND: i64 = 1000;

/// Client id and secret. Never printed in clear, not even through `Debug`.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `Basic base64(client_id:client_secret)`.
    pub fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &mask_sensitive(&self.client_id))
            .field("client_secret", &MASK)
            .finish()
    }
}

/// Authorization endpoint URL. Only constructible from an `https` URL, so a
/// misconfigured plain-text endpoint fails at startup instead of leaking the secret.
#[derive(Debug, Clone)]
pub struct AuthEndpoint(Url);

impl AuthEndpoint {
    pub fn parse(raw: &str) -> Result<Self, LlmError> {
        let url = Url::parse(raw).map_err(|e| {
            LlmError::Configuration(format!("authorization URL '{raw}' is invalid: {e}"))
        })?;
        if url.scheme() != "https" {
            return Err(LlmError::Configuration(format!(
                "authorization URL must use HTTPS, got '{}'",
                url.scheme()
            )));
        }
        Ok(Self(url))
    }

    /// Skips the scheme check so tests can point at a plain-HTTP mock server.
    #[cfg(test)]
    pub fn insecure(raw: &str) -> Self {
        Self(Url::parse(raw).expect("test URL"))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_at: Option<i64>,
}

/// Obtains bearer tokens, retrying authentication failures per the configured policy.
pub struct CredentialFetcher {
    executor: HttpExecutor,
    endpoint: AuthEndpoint,
    credentials: Credentials,
    scope: String,
    retry_policy: RetryPolicy,
}

impl CredentialFetcher {
    pub fn new(
        executor: HttpExecutor,
        endpoint: AuthEndpoint,
        credentials: Credentials,
        scope: impl Into<String>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            executor,
            endpoint,
            credentials,
            scope: scope.into(),
            retry_policy,
        }
    }

    /// Runs the exchange until it succeeds or the retry policy gives up.
    pub async fn fetch_token(&self) -> Result<Token, LlmError> {
        let token = retry(
            &self.retry_policy,
            "fetch access token",
            LlmError::is_authentication,
            |_| self.fetch_once(),
        )
        .await?;

        info!(
            expires_at = token.expires_at_millis,
            "Access token retrieved successfully"
        );
        Ok(token)
    }

    async fn fetch_once(&self) -> Result<Token, LlmError> {
        let mut authorization = HeaderValue::from_str(&self.credentials.basic_authorization())
            .map_err(|_| {
                LlmError::Configuration("client credentials contain invalid characters".into())
            })?;
        authorization.set_sensitive(true);

        let request = self
            .executor
            .client()
            .post(self.endpoint.url().clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .header(RQUID_HEADER, Uuid::new_v4().to_string())
            .header(AUTHORIZATION, authorization)
            .form(&[("scope", self.scope.as_str())]);

        let body = self
            .executor
            .execute_json(request, "token request")
            .await
            .map_err(|e| LlmError::from_token_transport("Failed to obtain access token", e))?;

        parse_token_response(body)
    }
}

#[async_trait]
impl TokenSource for CredentialFetcher {
    async fn fetch_token(&self) -> Result<Token, LlmError> {
        CredentialFetcher::fetch_token(self).await
    }
}

fn parse_token_response(body: Value) -> Result<Token, LlmError> {
    let parsed: TokenResponse = serde_json::from_value(body).map_err(|e| {
        error!(error = %e, "Invalid token response");
        LlmError::Authentication {
            message: "Invalid token response".to_string(),
            source: Some(Box::new(e)),
        }
    })?;

    match (parsed.access_token, parsed.expires_at) {
        (Some(value), Some(expires_at)) => Ok(Token::new(
            value,
            expires_at.saturating_mul(MILLIS_PER_SECOND),
        )),
        _ => {
            error!("Invalid token response: missing access_token or expires_at");
            Err(LlmError::authentication(
                "Invalid token response: missing access_token or expires_at",
            ))
        }
    }
}
