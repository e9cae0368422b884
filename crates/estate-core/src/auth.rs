//! Authentication service interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::identity::AuthSession;

/// Kind of session change pushed by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session change notification; `session` is `None` after sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

impl AuthChange {
    pub fn signed_in(session: AuthSession) -> Self {
        Self {
            event: AuthEvent::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            event: AuthEvent::SignedOut,
            session: None,
        }
    }
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created; the user must confirm by email before signing in.
    ConfirmationRequired,
    /// The service confirmed immediately and issued a session.
    SignedIn(AuthSession),
}

/// Subscription to session changes. Dropping it unsubscribes.
pub type SessionChanges = broadcast::Receiver<AuthChange>;

/// Operations of the hosted authentication service.
///
/// Errors from sign-in/sign-up/sign-out carry the service message verbatim
/// as [`crate::EstateError::Auth`].
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Returns the stored session, refreshing it if needed.
    async fn get_session(&self) -> Result<Option<AuthSession>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome>;

    async fn sign_out(&self) -> Result<()>;

    /// Subscribes to out-of-band session changes.
    fn subscribe(&self) -> SessionChanges;
}
