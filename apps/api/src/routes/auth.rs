//! Inbound HTTP Basic authentication for the analysis API.
//!
//! One username/password pair comes from configuration. Requests without a
//! matching `Authorization: Basic ..` header are rejected with 401.

use std::fmt;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::warn;

use crate::errors::AppError;
use crate::llm_client::masking::MASK;

/// Realm advertised in the `WWW-Authenticate` challenge.
pub const REALM: &str = "hr-analyzer";

#[derive(Clone)]
pub struct ApiUser {
    username: String,
    password: String,
}

impl ApiUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        // Evaluate both so a wrong username costs the same as a wrong password.
        let user_ok = constant_time_eq(self.username.as_bytes(), username.as_bytes());
        let pass_ok = constant_time_eq(self.password.as_bytes(), password.as_bytes());
        user_ok & pass_ok
    }
}

impl fmt::Debug for ApiUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiUser")
            .field("username", &self.username)
            .field("password", &MASK)
            .finish()
    }
}

/// Middleware guarding every route it is layered onto.
pub async fn require_basic_auth(
    State(user): State<ApiUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match basic_credentials(request.headers()) {
        Some((username, password)) if user.matches(&username, &password) => {
            Ok(next.run(request).await)
        }
        Some((username, _)) => {
            warn!(username = %username, path = %request.uri().path(), "rejected basic auth credentials");
            Err(AppError::Unauthorized)
        }
        None => Err(AppError::Unauthorized),
    }
}

/// Decodes `Authorization: Basic base64(user:pass)`. The password may contain `:`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_decodes_basic_header() {
        let creds = basic_credentials(&headers_with("Basic YWRtaW46czNjcmV0"));
        assert_eq!(creds, Some(("admin".to_string(), "s3cret".to_string())));
    }

    #[test]
    fn test_password_may_contain_colon() {
        let encoded = STANDARD.encode("admin:pa:ss");
        let creds = basic_credentials(&headers_with(&format!("basic {encoded}")));
        assert_eq!(creds, Some(("admin".to_string(), "pa:ss".to_string())));
    }

    #[test]
    fn test_rejects_other_schemes_and_garbage() {
        assert_eq!(basic_credentials(&headers_with("Bearer YWRtaW46czNjcmV0")), None);
        assert_eq!(basic_credentials(&headers_with("Basic !!!")), None);
        assert_eq!(basic_credentials(&HeaderMap::new()), None);
    }

    #[test]
    fn test_matches_requires_both_fields() {
        let user = ApiUser::new("admin", "s3cret");
        assert!(user.matches("admin", "s3cret"));
        assert!(!user.matches("admin", "s3cre"));
        assert!(!user.matches("root", "s3cret"));
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", ApiUser::new("admin", "s3cret"));
        assert!(debug.contains("admin"));
        assert!(!debug.contains("s3cret"));
    }
}
