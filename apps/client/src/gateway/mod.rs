//! API Gateway — the single point of entry for all backend calls.
//!
//! ARCHITECTURAL RULE: no other module may talk to the ResumeAI backend
//! directly. Every feature goes through this module so credential
//! injection and the unauthorized-response policy live in exactly one
//! place.
//!
//! The credential is pulled from `SessionStore` at send time, never cached
//! across requests: a real token can expire between two calls. An HTTP 401
//! from any endpoint means "the session is no longer valid" and triggers
//! one hard session reset; everything else passes through to the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::{AuthError, SessionStore};

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx backend response, 401 excepted. The message is the
    /// backend's `detail` field when it sends one.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The backend rejected the credential. By the time the caller sees
    /// this, the session has already been reset to the signed-out state.
    #[error("Session is no longer valid; please sign in again")]
    Unauthorized,

    /// Token acquisition failed before the request went out.
    #[error("Could not obtain a credential: {0}")]
    Token(#[from] AuthError),
}

/// FastAPI error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// The authenticated HTTP gateway, shared by every feature module.
pub struct ApiGateway {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiGateway {
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Self {
        Self {
            client: Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.execute(self.client.get(self.url(path))).await
    }

    pub async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.execute(self.client.post(self.url(path)).json(body)).await
    }

    /// POST with query-string parameters and an empty body, for endpoints
    /// that bind bare parameters from the query.
    pub async fn post_query<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R, ApiError> {
        self.execute(self.client.post(self.url(path)).query(query)).await
    }

    pub async fn post_multipart<R: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<R, ApiError> {
        self.execute(self.client.post(self.url(path)).multipart(form))
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the current credential, if there is one. A missing token is
    /// not an error: the request goes out without an `Authorization` header
    /// and the backend decides what that means.
    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self.session.token().await? {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Ok(request),
        }
    }

    async fn execute<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, ApiError> {
        let response = self.authorize(request).await?.send().await?;
        let status = response.status();
        debug!("backend responded {status}");

        if status == StatusCode::UNAUTHORIZED {
            // Any 401, from any endpoint, tears the session down.
            // The reset itself is idempotent.
            if self.session.reset() {
                warn!("unauthorized response; session reset to signed-out state");
            }
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::demo::DEMO_TOKEN;
    use crate::config::Config;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    /// Matches requests that carry no Authorization header at all.
    struct NoAuthHeader;

    impl Match for NoAuthHeader {
        fn matches(&self, request: &Request) -> bool {
            !request.headers.contains_key("authorization")
        }
    }

    fn demo_store() -> Arc<SessionStore> {
        Arc::new(SessionStore::initialize(&Config {
            api_base_url: "http://localhost:8000".to_string(),
            identity: None,
            token_retries: 0,
            rust_log: "info".to_string(),
        }))
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pong {
        ok: bool,
    }

    #[tokio::test]
    async fn demo_requests_carry_the_sentinel_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .and(header("authorization", format!("Bearer {DEMO_TOKEN}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = ApiGateway::new(&server.uri(), demo_store());
        let pong: Pong = gateway.get_json("/api/ping").await.unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn demo_token_survives_prior_sign_in() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .and(header("authorization", format!("Bearer {DEMO_TOKEN}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let store = demo_store();
        store.login("someone@else.com", "pw").await.unwrap();

        let gateway = ApiGateway::new(&server.uri(), store);
        let _: Pong = gateway.get_json("/api/ping").await.unwrap();
    }

    #[tokio::test]
    async fn unauthorized_resets_the_session_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = demo_store();
        let resets = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&resets);
        let _sub = store.subscribe(Box::new(move |session| {
            if session.principal.is_none() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let gateway = ApiGateway::new(&server.uri(), Arc::clone(&store));

        let first = gateway.get_json::<Pong>("/api/ping").await;
        assert!(matches!(first, Err(ApiError::Unauthorized)));
        assert!(store.session().principal.is_none());

        // A second 401 in quick succession surfaces the same error but
        // does not publish a second teardown.
        let second = gateway.get_json::<Pong>("/api/ping").await;
        assert!(matches!(second, Err(ApiError::Unauthorized)));
        assert_eq!(resets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_errors_pass_through_with_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analyze"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"detail": "Internal server error: boom"})),
            )
            .mount(&server)
            .await;

        let store = demo_store();
        let gateway = ApiGateway::new(&server.uri(), Arc::clone(&store));
        let err = gateway
            .post_json::<_, Pong>("/api/analyze", &serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal server error: boom");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        // Non-auth failures never touch the session.
        assert!(store.session().is_authenticated());
    }

    #[tokio::test]
    async fn validation_errors_keep_the_session_intact() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/analyze"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"detail": "Job description is required"})),
            )
            .mount(&server)
            .await;

        let store = demo_store();
        let gateway = ApiGateway::new(&server.uri(), Arc::clone(&store));
        let err = gateway
            .post_json::<_, Pong>("/api/analyze", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 400, .. }));
        assert!(store.session().is_authenticated());
    }

    #[tokio::test]
    async fn anonymous_real_session_sends_no_authorization_header() {
        use crate::config::IdentityConfig;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .and(NoAuthHeader)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        // Real mode, nobody signed in: the request must go out bare.
        let store = Arc::new(SessionStore::initialize(&Config {
            api_base_url: server.uri(),
            identity: Some(IdentityConfig {
                api_key: "test-key".to_string(),
                project_id: "test-project".to_string(),
                auth_domain: None,
                emulator_host: Some(server.address().to_string()),
            }),
            token_retries: 0,
            rust_log: "info".to_string(),
        }));

        let gateway = ApiGateway::new(&server.uri(), store);
        let pong: Pong = gateway.get_json("/api/ping").await.unwrap();
        assert!(pong.ok);
    }
}
