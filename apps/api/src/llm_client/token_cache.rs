//! Bearer token cache with single-flight refresh.
//!
//! One mutex guards the token together with the "refresh in progress" flag, so a
//! reader can never see a value paired with another refresh's expiry. A [`Notify`]
//! is used only to wake callers parked behind an in-flight refresh.
//!
//! State machine, evaluated on every [`TokenCache::get_valid_token`] call:
//! - fresh (`now < expires_at - refresh_buffer`): return the cached value;
//! - stale, nobody refreshing: this caller flips the flag and fetches;
//! - refreshing: park until the refresh finishes, then take its result.
//!
//! The flag is released by a drop guard, so a failed or cancelled refresh never
//! leaves later callers parked forever. Once the shutdown token fires, parked and
//! refreshing callers return [`LlmError::Cancelled`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::LlmError;

/// A bearer token and the instant (epoch millis) it stops being accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at_millis: i64,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at_millis: i64) -> Self {
        Self {
            value: value.into(),
            expires_at_millis,
        }
    }

    fn is_fresh(&self, now_millis: i64, buffer_millis: i64) -> bool {
        !self.value.is_empty() && now_millis < self.expires_at_millis.saturating_sub(buffer_millis)
    }
}

/// Where new tokens come from. Implemented by the credential fetcher; swapped for
/// fakes in tests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<Token, LlmError>;
}

/// Wall clock used for freshness decisions.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

struct CacheState {
    token: Token,
    refreshing: bool,
    /// Bumped every time a refresh finishes, successfully or not.
    generation: u64,
    /// Why the most recent refresh failed; cleared by the next success.
    last_failure: Option<String>,
}

pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    refresh_buffer_millis: i64,
    state: Mutex<CacheState>,
    refreshed: Notify,
    shutdown: CancellationToken,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>, refresh_buffer: Duration) -> Self {
        Self::with_clock(source, refresh_buffer, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn TokenSource>,
        refresh_buffer: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            clock,
            refresh_buffer_millis: i64::try_from(refresh_buffer.as_millis()).unwrap_or(i64::MAX),
            state: Mutex::new(CacheState {
                token: Token::default(),
                refreshing: false,
                generation: 0,
                last_failure: None,
            }),
            refreshed: Notify::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Ties waiting and refreshing to `shutdown`.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Returns a token that is valid for at least the refresh buffer, fetching a new
    /// one first if needed. Concurrent callers share a single fetch.
    pub async fn get_valid_token(&self) -> Result<String, LlmError> {
        loop {
            let notified = self.refreshed.notified();
            tokio::pin!(notified);

            let observed_generation = {
                let mut state = self.lock_state();
                if state.token.is_fresh(self.clock.now_millis(), self.refresh_buffer_millis) {
                    return Ok(state.token.value.clone());
                }
                if !state.refreshing {
                    state.refreshing = true;
                    None
                } else {
                    // Registered before the lock is released, so the leader's
                    // notify_waiters cannot slip past us.
                    notified.as_mut().enable();
                    Some(state.generation)
                }
            };

            let Some(observed_generation) = observed_generation else {
                return self.refresh_as_leader().await;
            };

            debug!("access token refresh in progress, waiting");
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!("stopped waiting for access token refresh");
                    return Err(LlmError::Cancelled);
                }
                _ = &mut notified => {}
            }

            let outcome = {
                let state = self.lock_state();
                if state.generation == observed_generation {
                    None
                } else if let Some(reason) = &state.last_failure {
                    Some(Err(LlmError::authentication(format!(
                        "Access token refresh failed: {reason}"
                    ))))
                } else if state
                    .token
                    .is_fresh(self.clock.now_millis(), self.refresh_buffer_millis)
                {
                    Some(Ok(state.token.value.clone()))
                } else {
                    // Invalidated or already stale again: start or join the next refresh.
                    None
                }
            };
            if let Some(outcome) = outcome {
                return outcome;
            }
        }
    }

    /// Consistent copy of the cached token.
    #[cfg(test)]
    fn snapshot(&self) -> Token {
        self.lock_state().token.clone()
    }

    /// Drops the cached token if it is still `rejected`, so the next caller fetches a
    /// new one. A newer token installed in the meantime is left alone.
    pub fn invalidate(&self, rejected: &str) {
        let mut state = self.lock_state();
        if state.token.value == rejected {
            state.token = Token::default();
            debug!("cached access token invalidated");
        }
    }

    async fn refresh_as_leader(&self) -> Result<String, LlmError> {
        let guard = RefreshGuard {
            cache: self,
            finished: false,
        };

        info!("Access token expired or about to expire, refreshing");
        let fetched = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!("access token refresh abandoned on shutdown");
                return Err(LlmError::Cancelled);
            }
            fetched = self.source.fetch_token() => fetched,
        };
        match fetched {
            Ok(token) => {
                let value = token.value.clone();
                guard.finish(Ok(token));
                Ok(value)
            }
            Err(e) => {
                guard.finish(Err(e.to_string()));
                Err(e)
            }
        }
    }

    fn finish_refresh(&self, outcome: Result<Token, String>) {
        {
            let mut state = self.lock_state();
            match outcome {
                Ok(token) => {
                    state.token = token;
                    state.last_failure = None;
                }
                Err(reason) => {
                    warn!(reason = %reason, "access token refresh failed");
                    state.last_failure = Some(reason);
                }
            }
            state.generation = state.generation.wrapping_add(1);
            state.refreshing = false;
        }
        self.refreshed.notify_waiters();
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        // Critical sections never panic midway, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held by the refreshing caller. Releases the refreshing flag and wakes waiters on
/// every exit path, including the leader's future being dropped mid-fetch.
struct RefreshGuard<'a> {
    cache: &'a TokenCache,
    finished: bool,
}

impl RefreshGuard<'_> {
    fn finish(mut self, outcome: Result<Token, String>) {
        self.finished = true;
        self.cache.finish_refresh(outcome);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache
                .finish_refresh(Err("refresh was abandoned before completing".to_string()));
        }
    }
}
