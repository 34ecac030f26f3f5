//! Single-shot HTTP exchange with outcome classification.
//!
//! The executor never retries. It sends one request, reads the body, and sorts the
//! result into success, auth rejection (401/403) or generic failure. Failure bodies
//! are logged masked; raw bodies never reach the logs.

use std::path::Path;
use std::time::Duration;

use reqwest::{Certificate, Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use super::error::{LlmError, TransportError};
use super::masking::mask_sensitive;

/// Connect and overall request timeout for every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Logged in place of a failure body the server did not send.
const NO_BODY: &str = "<no response body>";

#[derive(Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the shared client trusting the PEM certificate at `cert_path`
    /// (the GigaChat endpoints are signed by a CA missing from the default roots).
    pub fn with_trust_certificate(cert_path: &Path) -> Result<Self, LlmError> {
        let pem = std::fs::read(cert_path).map_err(|e| {
            LlmError::Configuration(format!(
                "certificate file {} is not readable: {e}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem).map_err(|e| {
            LlmError::Configuration(format!(
                "certificate file {} is not a valid PEM certificate: {e}",
                cert_path.display()
            ))
        })?;

        let client = Client::builder()
            .add_root_certificate(certificate)
            .connect_timeout(DEFAULT_TIMEOUT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::new(client))
    }

    /// The underlying client, for building requests handed back to [`Self::execute`].
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Sends `request` once and returns the body of a 2xx response as text.
    /// `context` names the exchange in logs and error messages.
    pub async fn execute(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<String, TransportError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(context, error = %e, "request could not be completed");
                return Err(TransportError::Request {
                    context: context.to_string(),
                    status: None,
                    reason: "request could not be completed".to_string(),
                    source: Some(Box::new(e)),
                });
            }
        };

        let status = response.status();

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) if !body.is_empty() => body,
                _ => NO_BODY.to_string(),
            };
            error!(
                context,
                status = status.as_u16(),
                body = %mask_sensitive(&body),
                "request failed"
            );
            return Err(classify_failure(context, status));
        }

        let body = response.text().await.map_err(|e| {
            error!(context, error = %e, "failed to read response body");
            TransportError::Request {
                context: context.to_string(),
                status: Some(status.as_u16()),
                reason: "failed to read response body".to_string(),
                source: Some(Box::new(e)),
            }
        })?;

        if body.is_empty() {
            error!(context, status = status.as_u16(), "response body is empty");
            return Err(TransportError::Request {
                context: context.to_string(),
                status: Some(status.as_u16()),
                reason: "response body is empty".to_string(),
                source: None,
            });
        }

        debug!(context, status = status.as_u16(), bytes = body.len(), "request succeeded");
        Ok(body)
    }

    /// Like [`Self::execute`], parsing the body as JSON.
    pub async fn execute_json(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<Value, TransportError> {
        let body = self.execute(request, context).await?;

        serde_json::from_str(&body).map_err(|e| {
            error!(context, body = %mask_sensitive(&body), "response is not valid JSON");
            TransportError::Request {
                context: context.to_string(),
                status: None,
                reason: "response is not valid JSON".to_string(),
                source: Some(Box::new(e)),
            }
        })
    }
}

fn classify_failure(context: &str, status: StatusCode) -> TransportError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransportError::Auth {
            context: context.to_string(),
            status: status.as_u16(),
        },
        _ => TransportError::Request {
            context: context.to_string(),
            status: Some(status.as_u16()),
            reason: format!("unexpected status {}", status.as_u16()),
            source: None,
        },
    }
}
