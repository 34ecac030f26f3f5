mod analysis;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::ResumeAnalyzer;
use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::llm_client::credentials::CredentialFetcher;
use crate::llm_client::{GigaChatClient, HttpExecutor, TokenCache};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HR Analyzer API v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    // Cancelled on Ctrl+C: stops the listener and releases callers parked on a token refresh
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
                return;
            }
            shutdown.cancel();
        }
    });

    // GigaChat client stack: one HTTP client, one token cache for the whole process
    let gigachat = &config.gigachat;
    let executor = HttpExecutor::with_trust_certificate(&gigachat.cert_path)?;
    let fetcher = CredentialFetcher::new(
        executor.clone(),
        gigachat.auth_url.clone(),
        gigachat.credentials.clone(),
        gigachat.scope.clone(),
        gigachat.retry.clone(),
    );
    let tokens = Arc::new(
        TokenCache::new(Arc::new(fetcher), gigachat.token_refresh_buffer)
            .with_shutdown(shutdown.clone()),
    );
    let llm = GigaChatClient::new(executor, gigachat.api_url.clone(), tokens)
        .with_refresh_on_auth_failure(gigachat.refresh_on_auth_failure);
    info!("GigaChat client initialized");

    let analyzer = ResumeAnalyzer::new(Arc::new(TextExtractor::new()), llm);

    // Build app state
    let state = AppState {
        analyzer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
