use thiserror::Error;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a single failed HTTP exchange, as classified by the executor.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote side rejected our credentials (401 / 403).
    #[error("{context}: rejected with status {status}")]
    Auth { context: String, status: u16 },

    /// Any other failure: connection/IO errors (no status) or non-2xx responses.
    #[error("{context}: {reason}")]
    Request {
        context: String,
        status: Option<u16>,
        reason: String,
        #[source]
        source: Option<Cause>,
    },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Auth { status, .. } => Some(*status),
            TransportError::Request { status, .. } => *status,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, TransportError::Auth { .. })
    }
}

/// Errors surfaced by the GigaChat client stack (token cache, credential fetcher,
/// analysis client).
#[derive(Debug, Error)]
pub enum LlmError {
    /// Fatal startup problem: bad endpoint scheme, unreadable certificate, etc.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A token could not be obtained, or the API rejected the one we sent.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// Any other failed exchange with the API.
    #[error("API request failed: {message}")]
    Request {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<Cause>,
    },

    /// The caller stopped waiting for an in-flight token refresh.
    #[error("Waiting for token refresh was cancelled")]
    Cancelled,
}

impl LlmError {
    pub fn authentication(message: impl Into<String>) -> Self {
        LlmError::Authentication {
            message: message.into(),
            source: None,
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        LlmError::Request {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, LlmError::Authentication { .. })
    }

    /// Wraps an executor failure as a token acquisition failure. Every executor
    /// outcome counts here, since the fetch is retried on exactly this kind.
    pub fn from_token_transport(message: impl Into<String>, err: TransportError) -> Self {
        LlmError::Authentication {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Translates an executor failure on an API call: 401/403 become
    /// [`LlmError::Authentication`], everything else [`LlmError::Request`].
    pub fn from_api_transport(message: impl Into<String>, err: TransportError) -> Self {
        let message = message.into();
        if err.is_auth() {
            LlmError::Authentication {
                message,
                source: Some(Box::new(err)),
            }
        } else {
            LlmError::Request {
                message,
                status: err.status(),
                source: Some(Box::new(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_api_transport_auth_maps_to_authentication() {
        let err = LlmError::from_api_transport(
            "GigaChat API request failed",
            TransportError::Auth {
                context: "chat completion".into(),
                status: 401,
            },
        );
        assert!(err.is_authentication());
        let source = err.source().expect("cause preserved");
        assert_eq!(source.to_string(), "chat completion: rejected with status 401");
    }

    #[test]
    fn test_api_transport_other_maps_to_request_with_status() {
        let err = LlmError::from_api_transport(
            "GigaChat API request failed",
            TransportError::Request {
                context: "chat completion".into(),
                status: Some(502),
                reason: "unexpected status 502".into(),
                source: None,
            },
        );
        assert!(matches!(err, LlmError::Request { status: Some(502), .. }));
    }

    #[test]
    fn test_token_transport_always_authentication() {
        let err = LlmError::from_token_transport(
            "Failed to obtain access token",
            TransportError::Request {
                context: "token request".into(),
                status: None,
                reason: "connection refused".into(),
                source: None,
            },
        );
        assert!(err.is_authentication());
    }
}
