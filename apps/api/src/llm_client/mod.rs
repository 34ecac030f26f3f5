/// GigaChat client, the single point of entry for all LLM calls in the analyzer.
///
/// ARCHITECTURAL RULE: No other module may call the GigaChat API directly.
/// All LLM interactions MUST go through [`GigaChatClient`].
///
/// Layering, leaves first:
/// - `transport`: one HTTP exchange, failures classified and logged masked;
/// - `credentials`: client-credentials exchange for a bearer token, with retry;
/// - `token_cache`: keeps the bearer token fresh, one refresh at a time;
/// - this module: builds the chat request and attaches the current token.
use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use tracing::warn;
use uuid::Uuid;

pub mod credentials;
pub mod error;
pub mod masking;
pub mod models;
pub mod prompts;
pub mod response;
pub mod retry;
pub mod token_cache;
pub mod transport;

pub use error::LlmError;
pub use models::{ChatRequest, GigaModel};
pub use token_cache::TokenCache;
pub use transport::HttpExecutor;

/// Per-request correlation id header required by both GigaChat endpoints.
pub const RQUID_HEADER: &str = "RqUID";

#[derive(Clone)]
pub struct GigaChatClient {
    executor: HttpExecutor,
    api_url: Url,
    tokens: Arc<TokenCache>,
    refresh_on_auth_failure: bool,
}

impl GigaChatClient {
    pub fn new(executor: HttpExecutor, api_url: Url, tokens: Arc<TokenCache>) -> Self {
        Self {
            executor,
            api_url,
            tokens,
            refresh_on_auth_failure: false,
        }
    }

    /// When enabled, a 401/403 from the API drops the rejected token and the call is
    /// resent once with a freshly fetched one. Off by default: freshness is otherwise
    /// purely time based, so a token revoked early fails exactly one call.
    pub fn with_refresh_on_auth_failure(mut self, enabled: bool) -> Self {
        self.refresh_on_auth_failure = enabled;
        self
    }

    /// Sends `document_text` to `model` under `system_prompt` and returns the raw
    /// response body.
    pub async fn analyze(
        &self,
        system_prompt: &str,
        document_text: &str,
        model: &str,
    ) -> Result<String, LlmError> {
        let request = ChatRequest::analysis(model, system_prompt, document_text);
        let token = self.tokens.get_valid_token().await?;

        match self.send(&request, &token).await {
            Err(err) if self.refresh_on_auth_failure && err.is_authentication() => {
                warn!("GigaChat rejected the access token, refreshing once and resending");
                self.tokens.invalidate(&token);
                let token = self.tokens.get_valid_token().await?;
                self.send(&request, &token).await
            }
            result => result,
        }
    }

    async fn send(&self, request: &ChatRequest<'_>, token: &str) -> Result<String, LlmError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| LlmError::authentication("Access token is not a valid header value"))?;
        bearer.set_sensitive(true);

        let builder = self
            .executor
            .client()
            .post(self.api_url.clone())
            .header(AUTHORIZATION, bearer)
            .header(CONTENT_TYPE, "application/json")
            .header(RQUID_HEADER, Uuid::new_v4().to_string())
            .json(request);

        self.executor
            .execute(builder, "chat completion")
            .await
            .map_err(|e| LlmError::from_api_transport("GigaChat API request failed", e))
    }
}
