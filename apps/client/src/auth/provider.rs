//! The `TokenProvider` seam: one trait, two backends.
//!
//! `SessionStore` holds an `Arc<dyn TokenProvider>` and never knows which
//! variant is behind it. Backend selection is a pure function of the
//! environment configuration (`detect_mode`), not a side effect of
//! initialization; activation failure is reported to the caller so the
//! fallback policy stays in one place (`SessionStore`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::{Principal, SessionMode};
use crate::config::IdentityConfig;

/// Errors surfaced by a token provider. None of these ever flips the
/// session into demo mode; that transition exists only at startup.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Identity backend could not be activated (missing or unusable
    /// configuration). Recovered by the caller via demo fallback.
    #[error("Identity provider not configured: {0}")]
    NotConfigured(String),

    /// The identity service rejected the credentials or the request.
    #[error("Identity service rejected the request: {0}")]
    Rejected(String),

    /// Network-level failure talking to the identity service.
    #[error("Identity service unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// No principal is signed in for an operation that needs one.
    #[error("Not signed in")]
    NotSignedIn,

    /// The operation exists on the other variant only.
    #[error("{0}")]
    Unsupported(&'static str),
}

/// Selects the session backend from the environment configuration.
/// Pure and deterministic: both the API key and the project id must be
/// present for real mode; anything less means demo.
pub fn detect_mode(identity: Option<&IdentityConfig>) -> SessionMode {
    match identity {
        Some(_) => SessionMode::Real,
        None => SessionMode::Demo,
    }
}

/// Callback invoked on every principal change (sign-in, sign-out, refresh).
/// Receives the new principal, or `None` on sign-out.
pub type PrincipalListener = Box<dyn Fn(Option<Principal>) + Send + Sync>;

/// A session backend. Carried as `Arc<dyn TokenProvider>`.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    fn mode(&self) -> SessionMode;

    /// The currently signed-in principal, if any.
    fn principal(&self) -> Option<Principal>;

    /// Returns a credential for the current principal. Demo answers
    /// immediately with the fixed sentinel; Firebase may suspend on a
    /// refresh round-trip and surfaces failures unchanged.
    async fn fetch_token(&self) -> Result<String, AuthError>;

    /// Registers a principal-change listener. Notifications are serialized:
    /// a listener is never invoked concurrently with itself. The returned
    /// handle unsubscribes on `unsubscribe()` or drop; every consumer must
    /// hold it for as long as it wants notifications.
    fn subscribe(&self, listener: PrincipalListener) -> ListenerHandle;

    async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<(), AuthError>;
    async fn sign_up_with_email(&self, email: &str, password: &str) -> Result<(), AuthError>;
    async fn sign_in_with_google(&self) -> Result<(), AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Listener registry — shared by both provider variants
// ────────────────────────────────────────────────────────────────────────────

type ListenerSlot = (u64, PrincipalListener);

/// Serialized principal-change fan-out. Dispatch holds the registry lock,
/// so notifications from one provider never interleave.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: Arc<Mutex<Vec<ListenerSlot>>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, listener: PrincipalListener) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .push((id, listener));
        ListenerHandle {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub(crate) fn notify(&self, principal: Option<&Principal>) {
        let listeners = self.listeners.lock().expect("listener registry poisoned");
        for (_, listener) in listeners.iter() {
            listener(principal.cloned());
        }
    }
}

/// Unsubscription handle for a principal-change listener. Dropping it
/// removes the listener, so teardown can't leak subscriptions.
pub struct ListenerHandle {
    id: u64,
    listeners: Weak<Mutex<Vec<ListenerSlot>>>,
}

impl ListenerHandle {
    /// Removes the listener now instead of at drop time.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut listeners) = listeners.lock() {
                listeners.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
