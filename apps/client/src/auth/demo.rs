//! Demo session backend: a fixed principal/token pair, no network, ever.
//!
//! Activates when the identity provider is unconfigured or broken, so a
//! misconfigured install still gets a usable session.

use async_trait::async_trait;

use std::sync::Mutex;

use crate::auth::provider::{AuthError, ListenerHandle, ListenerRegistry, PrincipalListener};
use crate::auth::{Principal, SessionMode, TokenProvider};

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_UID: &str = "demo-user-123";
/// The sentinel credential attached to every request in demo mode.
pub const DEMO_TOKEN: &str = "demo-token-123";

fn demo_principal() -> Principal {
    Principal {
        identifier: DEMO_EMAIL.to_string(),
        uid: DEMO_UID.to_string(),
    }
}

/// The demo variant. Every command is a pure local state transition;
/// sign-in never validates anything, sign-out just clears the principal.
pub struct DemoTokenProvider {
    principal: Mutex<Option<Principal>>,
    listeners: ListenerRegistry,
}

impl DemoTokenProvider {
    /// Demo activation signs in immediately — there is no anonymous
    /// waiting state to sit in when no backend exists.
    pub fn activate() -> Self {
        Self {
            principal: Mutex::new(Some(demo_principal())),
            listeners: ListenerRegistry::new(),
        }
    }

    fn set_principal(&self, principal: Option<Principal>) {
        *self.principal.lock().expect("demo principal poisoned") = principal.clone();
        self.listeners.notify(principal.as_ref());
    }
}

#[async_trait]
impl TokenProvider for DemoTokenProvider {
    fn mode(&self) -> SessionMode {
        SessionMode::Demo
    }

    fn principal(&self) -> Option<Principal> {
        self.principal.lock().expect("demo principal poisoned").clone()
    }

    /// Constant, regardless of sign-in history.
    async fn fetch_token(&self) -> Result<String, AuthError> {
        Ok(DEMO_TOKEN.to_string())
    }

    fn subscribe(&self, listener: PrincipalListener) -> ListenerHandle {
        self.listeners.add(listener)
    }

    /// Accepts any credentials; the supplied email becomes the identifier
    /// so the UI shows what the user typed.
    async fn sign_in_with_email(&self, email: &str, _password: &str) -> Result<(), AuthError> {
        self.set_principal(Some(Principal {
            identifier: email.to_string(),
            uid: DEMO_UID.to_string(),
        }));
        Ok(())
    }

    async fn sign_up_with_email(&self, email: &str, password: &str) -> Result<(), AuthError> {
        // Same transition as sign-in: there is no account to create.
        self.sign_in_with_email(email, password).await
    }

    async fn sign_in_with_google(&self) -> Result<(), AuthError> {
        self.set_principal(Some(demo_principal()));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.set_principal(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn activation_is_already_signed_in() {
        let provider = DemoTokenProvider::activate();
        let principal = provider.principal().unwrap();
        assert_eq!(principal.identifier, DEMO_EMAIL);
        assert_eq!(principal.uid, DEMO_UID);
    }

    #[tokio::test]
    async fn token_is_constant_across_sign_ins() {
        let provider = DemoTokenProvider::activate();
        assert_eq!(provider.fetch_token().await.unwrap(), DEMO_TOKEN);

        provider.sign_in_with_email("a@b.com", "x").await.unwrap();
        assert_eq!(provider.fetch_token().await.unwrap(), DEMO_TOKEN);

        provider.sign_out().await.unwrap();
        assert_eq!(provider.fetch_token().await.unwrap(), DEMO_TOKEN);
    }

    #[tokio::test]
    async fn sign_in_rewrites_identifier_and_notifies() {
        let provider = DemoTokenProvider::activate();
        let notified = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&notified);
        let _handle = provider.subscribe(Box::new(move |principal| {
            assert_eq!(principal.unwrap().identifier, "a@b.com");
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        provider.sign_in_with_email("a@b.com", "x").await.unwrap();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(provider.principal().unwrap().identifier, "a@b.com");
    }

    #[tokio::test]
    async fn sign_out_clears_principal() {
        let provider = DemoTokenProvider::activate();
        provider.sign_out().await.unwrap();
        assert!(provider.principal().is_none());
    }
}
