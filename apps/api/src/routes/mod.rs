pub mod analysis;
pub mod auth;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/analysis/resume",
            post(analysis::handle_analyze_resume),
        )
        .layer(DefaultBodyLimit::max(analysis::MAX_UPLOAD_BYTES))
        .route_layer(middleware::from_fn_with_state(
            state.config.api_user.clone(),
            auth::require_basic_auth,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .merge(protected)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use reqwest::Url;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::analysis::ResumeAnalyzer;
    use crate::config::{Config, GigaChatConfig};
    use crate::extraction::TextExtractor;
    use crate::llm_client::credentials::{AuthEndpoint, CredentialFetcher, Credentials, DEFAULT_SCOPE};
    use crate::llm_client::retry::RetryPolicy;
    use crate::llm_client::{GigaChatClient, HttpExecutor, TokenCache};
    use crate::routes::auth::ApiUser;

    const BOUNDARY: &str = "hr-analyzer-test-boundary";
    const ADMIN_AUTH: &str = "Basic YWRtaW46czNjcmV0";

    fn app(server: &MockServer) -> Router {
        let auth_url = format!("{}/api/v2/oauth", server.uri());
        let api_url = Url::parse(&format!("{}/api/v1/chat/completions", server.uri())).unwrap();
        let credentials = Credentials::new("client-id", "client-secret");
        let retry = RetryPolicy {
            max_attempts: 1,
            initial_delay: Duration::from_millis(10),
            multiplier: 2.0,
        };

        let executor = HttpExecutor::new(reqwest::Client::new());
        let fetcher = CredentialFetcher::new(
            executor.clone(),
            AuthEndpoint::insecure(&auth_url),
            credentials.clone(),
            DEFAULT_SCOPE,
            retry.clone(),
        );
        let tokens = Arc::new(TokenCache::new(Arc::new(fetcher), Duration::from_secs(60)));
        let analyzer = ResumeAnalyzer::new(
            Arc::new(TextExtractor::new()),
            GigaChatClient::new(executor, api_url.clone(), tokens),
        );

        let config = Config {
            gigachat: GigaChatConfig {
                api_url,
                auth_url: AuthEndpoint::insecure(&auth_url),
                credentials,
                cert_path: PathBuf::from("unused.pem"),
                scope: DEFAULT_SCOPE.to_string(),
                token_refresh_buffer: Duration::from_secs(60),
                retry,
                refresh_on_auth_failure: false,
            },
            api_user: ApiUser::new("admin", "s3cret"),
            port: 0,
            rust_log: "debug".to_string(),
        };

        build_router(AppState { analyzer, config })
    }

    fn multipart_body(file_name: &str, content: &str, extra: &[(&str, &str)]) -> String {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n"
        );
        for (name, value) in extra {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn upload(body: String, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/analysis/resume")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let server = MockServer::start().await;
        let response = app(&server)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "hr-analyzer");
    }

    #[tokio::test]
    async fn test_analysis_requires_basic_auth() {
        let server = MockServer::start().await;
        let body = multipart_body("cv.txt", "Rust engineer", &[]);

        let anonymous = app(&server).oneshot(upload(body.clone(), None)).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            anonymous.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"hr-analyzer\""
        );

        // admin:wrong
        let wrong = app(&server)
            .oneshot(upload(body, Some("Basic YWRtaW46d3Jvbmc=")))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unsupported_file_is_bad_request() {
        let server = MockServer::start().await;
        let response = app(&server)
            .oneshot(upload(
                multipart_body("cv.odt", "Rust engineer", &[]),
                Some(ADMIN_AUTH),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], "UNSUPPORTED_FILE_TYPE");
    }

    #[tokio::test]
    async fn test_unknown_prompt_type_is_bad_request() {
        let server = MockServer::start().await;
        let response = app(&server)
            .oneshot(upload(
                multipart_body("cv.txt", "Rust engineer", &[("promptType", "LEAD_ANALYSIS")]),
                Some(ADMIN_AUTH),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analysis_returns_plain_text_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/oauth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok1",
                "expires_at": 1999999999
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "{\"verdict\":\"hire\"}" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server)
            .oneshot(upload(
                multipart_body(
                    "cv.txt",
                    "Rust engineer",
                    &[("promptType", "MIDDLE_ANALYSIS"), ("gigaModelType", "GIGA_CHAT_MAX")],
                ),
                Some(ADMIN_AUTH),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body_text(response).await, "{\"verdict\":\"hire\"}");
    }
}
