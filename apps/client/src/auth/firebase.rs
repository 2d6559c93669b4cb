//! Firebase session backend, spoken over the Identity Toolkit REST API.
//!
//! Sign-in/sign-up go to `identitytoolkit.googleapis.com`; token refresh
//! goes to `securetoken.googleapis.com`. `FIREBASE_AUTH_EMULATOR_HOST`
//! reroutes both to the emulator, the same way the official SDKs do.
//!
//! Failures here are surfaced to the caller unchanged. Falling back to the
//! demo backend is `SessionStore`'s decision and happens only at startup.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::provider::{AuthError, ListenerHandle, ListenerRegistry, PrincipalListener};
use crate::auth::{Principal, SessionMode, TokenProvider};
use crate::config::IdentityConfig;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Tokens within this margin of expiry are refreshed instead of reused.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    /// Seconds until expiry, as a decimal string ("3600").
    expires_in: String,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct IdentityError {
    error: IdentityErrorBody,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    message: String,
}

/// Signed-in credentials, replaced wholesale on every transition.
struct TokenState {
    principal: Principal,
    id_token: String,
    refresh_token: String,
    expires_at: Instant,
}

/// The real variant. One HTTP client, credentials behind a mutex,
/// principal changes published through the shared listener registry.
pub struct FirebaseTokenProvider {
    client: Client,
    api_key: String,
    identity_base: String,
    token_base: String,
    state: Mutex<Option<TokenState>>,
    listeners: ListenerRegistry,
}

impl FirebaseTokenProvider {
    /// Validates the configuration and builds the HTTP client. Errors are
    /// returned, not swallowed: the caller owns the demo fallback.
    pub fn activate(cfg: &IdentityConfig) -> Result<Self, AuthError> {
        if cfg.api_key.trim().is_empty() {
            return Err(AuthError::NotConfigured("empty API key".to_string()));
        }
        if cfg.project_id.trim().is_empty() {
            return Err(AuthError::NotConfigured("empty project id".to_string()));
        }

        let (identity_base, token_base) = match &cfg.emulator_host {
            Some(host) => (
                format!("http://{host}/identitytoolkit.googleapis.com/v1"),
                format!("http://{host}/securetoken.googleapis.com/v1"),
            ),
            None => (
                IDENTITY_TOOLKIT_URL.to_string(),
                SECURE_TOKEN_URL.to_string(),
            ),
        };

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            identity_base,
            token_base,
            state: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Runs one of the `accounts:*` credential exchanges and publishes the
    /// resulting principal. Used by both sign-in and sign-up.
    async fn credential_exchange(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let url = format!(
            "{}/accounts:{}?key={}",
            self.identity_base, endpoint, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(identity_error_message(&body)));
        }

        let signed_in: SignInResponse = response.json().await?;
        debug!("identity exchange ok (accounts:{endpoint}, uid {})", signed_in.local_id);

        let principal = Principal {
            identifier: signed_in
                .email
                .clone()
                .unwrap_or_else(|| signed_in.local_id.clone()),
            uid: signed_in.local_id.clone(),
        };

        *self.state.lock().expect("firebase state poisoned") = Some(TokenState {
            principal: principal.clone(),
            expires_at: expiry_from_now(&signed_in.expires_in),
            id_token: signed_in.id_token,
            refresh_token: signed_in.refresh_token,
        });

        self.listeners.notify(Some(&principal));
        Ok(())
    }

    /// Exchanges the refresh token for a fresh id token.
    async fn refresh(&self, refresh_token: String) -> Result<String, AuthError> {
        let url = format!("{}/token?key={}", self.token_base, self.api_key);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("token refresh rejected ({status})");
            return Err(AuthError::Rejected(identity_error_message(&body)));
        }

        let refreshed: RefreshResponse = response.json().await?;
        let expires_at = expiry_from_now(&refreshed.expires_in);

        // The principal may have signed out while the request was in
        // flight; only a still-live session absorbs the new credentials.
        let mut state = self.state.lock().expect("firebase state poisoned");
        if let Some(state) = state.as_mut() {
            state.id_token = refreshed.id_token.clone();
            state.refresh_token = refreshed.refresh_token;
            state.expires_at = expires_at;
        }

        Ok(refreshed.id_token)
    }
}

#[async_trait]
impl TokenProvider for FirebaseTokenProvider {
    fn mode(&self) -> SessionMode {
        SessionMode::Real
    }

    fn principal(&self) -> Option<Principal> {
        self.state
            .lock()
            .expect("firebase state poisoned")
            .as_ref()
            .map(|s| s.principal.clone())
    }

    /// Returns the cached id token while it is fresh, otherwise refreshes.
    /// Always reflects the newest principal: the cache is replaced on every
    /// sign-in and cleared on sign-out.
    async fn fetch_token(&self) -> Result<String, AuthError> {
        // Snapshot under the lock; the refresh round-trip must not hold it.
        let (cached, refresh_token) = {
            let state = self.state.lock().expect("firebase state poisoned");
            match state.as_ref() {
                None => return Err(AuthError::NotSignedIn),
                Some(s) if s.expires_at > Instant::now() + EXPIRY_MARGIN => {
                    (Some(s.id_token.clone()), String::new())
                }
                Some(s) => (None, s.refresh_token.clone()),
            }
        };

        match cached {
            Some(token) => Ok(token),
            None => self.refresh(refresh_token).await,
        }
    }

    fn subscribe(&self, listener: PrincipalListener) -> ListenerHandle {
        self.listeners.add(listener)
    }

    async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.credential_exchange("signInWithPassword", email, password)
            .await
    }

    async fn sign_up_with_email(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.credential_exchange("signUp", email, password).await
    }

    /// The popup flow has no terminal equivalent.
    async fn sign_in_with_google(&self) -> Result<(), AuthError> {
        Err(AuthError::Unsupported(
            "Google sign-in requires a browser; use email sign-in",
        ))
    }

    /// Client-local, like the SDK's `signOut`: discard credentials and
    /// notify. The backend is not involved.
    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.state.lock().expect("firebase state poisoned") = None;
        self.listeners.notify(None);
        Ok(())
    }
}

/// Pulls the message out of an Identity Toolkit error body
/// (`{"error": {"message": "EMAIL_NOT_FOUND", ...}}`), falling back to the
/// raw body when it doesn't parse.
fn identity_error_message(body: &str) -> String {
    serde_json::from_str::<IdentityError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn expiry_from_now(expires_in: &str) -> Instant {
    let seconds = expires_in.parse::<u64>().unwrap_or(0);
    Instant::now() + Duration::from_secs(seconds)
}
