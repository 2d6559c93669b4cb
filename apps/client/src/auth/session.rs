//! `SessionStore` — owner of the single `Session` and of the active
//! `TokenProvider`.
//!
//! State machine: `Initializing → {Authenticated(Real), Authenticated(Demo),
//! Anonymous}`. Startup selects the backend via `detect_mode`; a real
//! backend that fails to activate falls back to demo instead of leaving the
//! user without a session. After startup the mode never changes.
//!
//! All session mutation happens here: either in the provider-change
//! listener (the one authoritative source in real mode) or in `reset`, the
//! hard 401 teardown. Everything else reads snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, info, warn};

use crate::auth::demo::{DemoTokenProvider, DEMO_TOKEN};
use crate::auth::firebase::FirebaseTokenProvider;
use crate::auth::provider::{detect_mode, AuthError, ListenerHandle, TokenProvider};
use crate::auth::{Principal, Session, SessionMode};
use crate::config::Config;

/// Callback invoked with a snapshot after every published session change.
pub type SessionListener = Box<dyn Fn(&Session) + Send + Sync>;

type SubscriberSlot = (u64, SessionListener);

struct Inner {
    provider: Arc<dyn TokenProvider>,
    session: Mutex<Session>,
    subscribers: Arc<Mutex<Vec<SubscriberSlot>>>,
    next_sub_id: AtomicU64,
    token_retries: u32,
}

impl Inner {
    /// Re-derives the session from a provider notification and publishes
    /// it. In real mode the token is deliberately left absent here: it is
    /// fetched lazily at request time, never raced at transition time.
    fn apply_principal(&self, principal: Option<Principal>) {
        let snapshot = {
            let mut session = self.session.lock().expect("session poisoned");
            session.principal = principal;
            session.loading = false;
            session.token = match session.mode {
                SessionMode::Demo => Some(DEMO_TOKEN.to_string()),
                SessionMode::Real => None,
            };
            session.clone()
        };
        self.publish(&snapshot);
    }

    /// Invokes subscribers under the lock, so published states are seen in
    /// order and never concurrently.
    fn publish(&self, snapshot: &Session) {
        let subscribers = self.subscribers.lock().expect("subscribers poisoned");
        for (_, listener) in subscribers.iter() {
            listener(snapshot);
        }
    }
}

/// Process-wide session state. Created once at startup; dropping it
/// unsubscribes from the provider.
pub struct SessionStore {
    inner: Arc<Inner>,
    _provider_sub: ListenerHandle,
}

impl SessionStore {
    /// Selects and activates the session backend, then derives the initial
    /// session state. Never fails: any activation error lands in demo mode,
    /// silently from the user's point of view.
    pub fn initialize(config: &Config) -> Self {
        let provider: Arc<dyn TokenProvider> = match detect_mode(config.identity.as_ref()) {
            SessionMode::Demo => {
                info!("identity provider not configured; running in demo mode");
                Arc::new(DemoTokenProvider::activate())
            }
            SessionMode::Real => {
                let identity = config
                    .identity
                    .as_ref()
                    .expect("detect_mode returned Real without identity config");
                match FirebaseTokenProvider::activate(identity) {
                    Ok(provider) => Arc::new(provider),
                    Err(e) => {
                        // Mandatory fallback: never strand the user on a
                        // broken identity configuration.
                        warn!("identity provider activation failed, falling back to demo mode: {e}");
                        Arc::new(DemoTokenProvider::activate())
                    }
                }
            }
        };

        let mode = provider.mode();
        let inner = Arc::new(Inner {
            provider,
            session: Mutex::new(Session {
                principal: None,
                token: None,
                loading: true,
                mode,
            }),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_sub_id: AtomicU64::new(0),
            token_retries: config.token_retries,
        });

        // Session state is derived from provider notifications only; the
        // weak reference keeps the listener from cycling the store alive.
        let weak = Arc::downgrade(&inner);
        let provider_sub = inner.provider.subscribe(Box::new(move |principal| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_principal(principal);
            }
        }));

        // Leave `Initializing` with whatever the provider knows right now:
        // demo is already signed in, real starts anonymous.
        inner.apply_principal(inner.provider.principal());
        debug!("session initialized (mode {mode:?})");

        SessionStore {
            inner,
            _provider_sub: provider_sub,
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.session.lock().expect("session poisoned").clone()
    }

    /// The credential for an outbound request, derived at call time.
    ///
    /// Demo mode always answers with the sentinel. Real mode fetches from
    /// the provider only when a principal is published; transport failures
    /// are retried up to the configured bound and then surfaced — they
    /// never change the session mode. `Ok(None)` means "send without an
    /// Authorization header".
    pub async fn token(&self) -> Result<Option<String>, AuthError> {
        let session = self.session();
        if session.mode == SessionMode::Demo {
            return Ok(Some(DEMO_TOKEN.to_string()));
        }
        if session.loading || session.principal.is_none() {
            return Ok(None);
        }

        let mut attempt = 0;
        loop {
            match self.inner.provider.fetch_token().await {
                Ok(token) => return Ok(Some(token)),
                Err(AuthError::NotSignedIn) => return Ok(None),
                Err(e) if retryable(&e) && attempt < self.inner.token_retries => {
                    attempt += 1;
                    warn!("token fetch failed (attempt {attempt}), retrying: {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ── Explicit session commands ───────────────────────────────────────
    // Demo rewrites local state synchronously; real delegates to the
    // identity service. Either way the published session changes only
    // through the provider listener.

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.inner.provider.sign_in_with_email(email, password).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.inner.provider.sign_up_with_email(email, password).await
    }

    pub async fn login_with_google(&self) -> Result<(), AuthError> {
        self.inner.provider.sign_in_with_google().await
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.inner.provider.sign_out().await
    }

    /// Hard session teardown, the 401 policy. Clears the published
    /// principal and token and returns whether anything was actually torn
    /// down, so back-to-back unauthorized responses reset only once.
    pub fn reset(&self) -> bool {
        let snapshot = {
            let mut session = self.inner.session.lock().expect("session poisoned");
            if session.principal.is_none() && !session.loading {
                return false;
            }
            session.principal = None;
            session.loading = false;
            session.token = match session.mode {
                // Demo keeps its constant credential even when reset.
                SessionMode::Demo => Some(DEMO_TOKEN.to_string()),
                SessionMode::Real => None,
            };
            session.clone()
        };
        self.inner.publish(&snapshot);
        true
    }

    /// Registers a session-change listener. The handle unsubscribes on
    /// `unsubscribe()` or drop; holding it past teardown leaks nothing,
    /// dropping it early just stops the notifications.
    pub fn subscribe(&self, listener: SessionListener) -> SessionSubscription {
        let id = self.inner.next_sub_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .expect("subscribers poisoned")
            .push((id, listener));
        SessionSubscription {
            id,
            subscribers: Arc::downgrade(&self.inner.subscribers),
        }
    }
}

/// True for failures worth retrying: transport-level errors only.
/// Rejections and missing principals are stable answers, not glitches.
fn retryable(error: &AuthError) -> bool {
    matches!(error, AuthError::Http(_))
}

/// Unsubscription handle for a session-change listener.
pub struct SessionSubscription {
    id: u64,
    subscribers: Weak<Mutex<Vec<SubscriberSlot>>>,
}

impl SessionSubscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            if let Ok(mut subscribers) = subscribers.lock() {
                subscribers.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
