use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use tracing::info;

use crate::llm_client::credentials::{AuthEndpoint, Credentials, DEFAULT_SCOPE};
use crate::llm_client::masking::mask_sensitive;
use crate::llm_client::retry::RetryPolicy;
use crate::routes::auth::ApiUser;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub gigachat: GigaChatConfig,
    pub api_user: ApiUser,
    pub port: u16,
    pub rust_log: String,
}

/// Everything the GigaChat client stack needs.
#[derive(Debug, Clone)]
pub struct GigaChatConfig {
    pub api_url: Url,
    pub auth_url: AuthEndpoint,
    pub credentials: Credentials,
    pub cert_path: PathBuf,
    pub scope: String,
    pub token_refresh_buffer: Duration,
    pub retry: RetryPolicy,
    pub refresh_on_auth_failure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let api_url = require("GIGACHAT_API_URL")?;
        let api_url = Url::parse(&api_url)
            .with_context(|| format!("GIGACHAT_API_URL '{api_url}' is not a valid URL"))?;
        let auth_url = AuthEndpoint::parse(&require("GIGACHAT_AUTH_URL")?)?;

        let cert_path = PathBuf::from(require("GIGACHAT_CERT_PATH")?);
        std::fs::metadata(&cert_path).with_context(|| {
            format!(
                "Certificate file not found or unreadable: {}",
                cert_path.display()
            )
        })?;

        let retry = RetryPolicy {
            max_attempts: parse_or(&lookup, "GIGACHAT_RETRY_MAX_ATTEMPTS", 3)?,
            initial_delay: Duration::from_millis(parse_or(
                &lookup,
                "GIGACHAT_RETRY_INITIAL_DELAY_MS",
                1000,
            )?),
            multiplier: parse_or(&lookup, "GIGACHAT_RETRY_MULTIPLIER", 2.0)?,
        };
        if retry.max_attempts == 0 {
            bail!("GIGACHAT_RETRY_MAX_ATTEMPTS must be at least 1");
        }
        if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
            bail!("GIGACHAT_RETRY_MULTIPLIER must be a finite number >= 1");
        }

        let gigachat = GigaChatConfig {
            api_url,
            auth_url,
            credentials: Credentials::new(
                require("GIGACHAT_CLIENT_ID")?,
                require("GIGACHAT_CLIENT_SECRET")?,
            ),
            cert_path,
            scope: lookup("GIGACHAT_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            token_refresh_buffer: Duration::from_millis(parse_or(
                &lookup,
                "GIGACHAT_TOKEN_REFRESH_BUFFER_MS",
                60_000,
            )?),
            retry,
            refresh_on_auth_failure: parse_or(&lookup, "GIGACHAT_REFRESH_ON_AUTH_FAILURE", false)?,
        };

        Ok(Config {
            gigachat,
            api_user: ApiUser::new(require("API_USERNAME")?, require("API_PASSWORD")?),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Logs the effective configuration with credentials masked.
    pub fn log_summary(&self) {
        let g = &self.gigachat;
        info!(
            api_url = %g.api_url,
            auth_url = %g.auth_url.url(),
            client_id = %mask_sensitive(g.credentials.client_id()),
            cert_path = %g.cert_path.display(),
            scope = %g.scope,
            refresh_buffer_ms = g.token_refresh_buffer.as_millis() as u64,
            retry_max_attempts = g.retry.max_attempts,
            retry_initial_delay_ms = g.retry.initial_delay.as_millis() as u64,
            retry_multiplier = g.retry.multiplier,
            refresh_on_auth_failure = g.refresh_on_auth_failure,
            "GigaChat config loaded"
        );
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        _ => Ok(default),
    }
}
