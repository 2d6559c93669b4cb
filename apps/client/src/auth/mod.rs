//! Session and authentication: the one part of the client with real state.
//!
//! Three layers, leaf to root:
//! - `provider` — the `TokenProvider` trait and backend selection
//! - `demo` / `firebase` — the two provider variants
//! - `session` — the `SessionStore` state machine that owns the `Session`

pub mod demo;
pub mod firebase;
pub mod provider;
pub mod session;

pub use provider::{detect_mode, AuthError, ListenerHandle, TokenProvider};
pub use session::{SessionStore, SessionSubscription};

/// Which session backend is active. Selected once at startup and fixed for
/// the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Backed by the Firebase identity service.
    Real,
    /// No-backend fallback usable without any identity configuration.
    Demo,
}

/// The identity associated with a signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Email address, or an opaque id for providers that don't expose one.
    pub identifier: String,
    pub uid: String,
}

/// Snapshot of the current session. `SessionStore` owns the single mutable
/// instance; everything handed out is a clone taken at read time.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Option<Principal>,
    pub token: Option<String>,
    /// True only between startup and the first authoritative provider
    /// notification. While set, `principal` and `token` must not be trusted.
    pub loading: bool,
    pub mode: SessionMode,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.principal.is_some()
    }
}
