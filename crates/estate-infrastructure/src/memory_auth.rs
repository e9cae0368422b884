//! In-memory auth backend for tests and the offline demo.
//!
//! Reproduces the observable behaviour of the hosted service: password
//! accounts, optional email confirmation, verbatim error messages, and a
//! change feed that can also be driven from outside (`push_change`).

use async_trait::async_trait;
use estate_core::auth::{AuthBackend, AuthChange, AuthEvent, SessionChanges, SignUpOutcome};
use estate_core::error::{EstateError, Result};
use estate_core::identity::{AuthSession, AuthUser};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";
pub const EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";
pub const ALREADY_REGISTERED: &str = "User already registered";
pub const WEAK_PASSWORD: &str = "Password should be at least 6 characters";

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    session: Option<AuthSession>,
    fail_session_check: bool,
}

pub struct MemoryAuth {
    state: Mutex<AuthState>,
    auto_confirm: bool,
    changes: broadcast::Sender<AuthChange>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuth {
    /// New accounts must be confirmed before they can sign in.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(AuthState::default()),
            auto_confirm: false,
            changes,
        }
    }

    /// New accounts are confirmed on sign-up and the outcome carries a
    /// session. The session is not stored: the user still signs in.
    pub fn with_auto_confirm() -> Self {
        Self {
            auto_confirm: true,
            ..Self::new()
        }
    }

    /// Creates a confirmed account directly.
    pub fn register(&self, email: &str, password: &str) -> Result<AuthUser> {
        let mut state = self.lock()?;
        let user = new_user(email);
        state.accounts.insert(
            normalize(email),
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed: true,
            },
        );
        Ok(user)
    }

    /// Marks a pending account as confirmed (the email link was followed).
    pub fn confirm(&self, email: &str) -> Result<()> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(&normalize(email))
            .ok_or_else(|| EstateError::not_found("account", email))?;
        account.confirmed = true;
        Ok(())
    }

    /// Makes `get_session` fail until cleared.
    pub fn set_session_check_failure(&self, fail: bool) -> Result<()> {
        self.lock()?.fail_session_check = fail;
        Ok(())
    }

    /// Simulates a change that did not originate from this client, such as
    /// a sign-out in another tab or an expired refresh token.
    pub fn push_change(&self, change: AuthChange) -> Result<()> {
        self.lock()?.session = change.session.clone();
        let _ = self.changes.send(change);
        Ok(())
    }

    pub fn current_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.lock()?.session.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, AuthState>> {
        self.state
            .lock()
            .map_err(|_| EstateError::internal("memory auth lock poisoned"))
    }

    fn start_session(&self, state: &mut AuthState, user: AuthUser) -> AuthSession {
        let session = new_session(user);
        state.session = Some(session.clone());
        let _ = self.changes.send(AuthChange::signed_in(session.clone()));
        session
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_session(user: AuthUser) -> AuthSession {
    AuthSession {
        access_token: format!("memory-{}", Uuid::new_v4()),
        refresh_token: Some(Uuid::new_v4().to_string()),
        expires_at: None,
        user,
    }
}

fn new_user(email: &str) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4().to_string(),
        email: Some(email.trim().to_string()),
        avatar_url: None,
    }
}

#[async_trait]
impl AuthBackend for MemoryAuth {
    async fn get_session(&self) -> Result<Option<AuthSession>> {
        let state = self.lock()?;
        if state.fail_session_check {
            return Err(EstateError::network("session check failed"));
        }
        Ok(state.session.clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let mut state = self.lock()?;
        let user = match state.accounts.get(&normalize(email)) {
            Some(account) if account.password == password => {
                if !account.confirmed {
                    return Err(EstateError::auth(EMAIL_NOT_CONFIRMED));
                }
                account.user.clone()
            }
            _ => return Err(EstateError::auth(INVALID_CREDENTIALS)),
        };
        tracing::debug!("[MemoryAuth] Signed in user {}", user.id);
        Ok(self.start_session(&mut state, user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EstateError::auth(WEAK_PASSWORD));
        }
        let mut state = self.lock()?;
        let key = normalize(email);
        if state.accounts.contains_key(&key) {
            return Err(EstateError::auth(ALREADY_REGISTERED));
        }

        let user = new_user(email);
        state.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed: self.auto_confirm,
            },
        );
        tracing::debug!(
            "[MemoryAuth] Registered {} (redirect: {:?})",
            user.id,
            redirect_to
        );

        if self.auto_confirm {
            Ok(SignUpOutcome::SignedIn(new_session(user)))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    async fn sign_out(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.session.take().is_some() {
            let _ = self.changes.send(AuthChange {
                event: AuthEvent::SignedOut,
                session: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> SessionChanges {
        self.changes.subscribe()
    }
}
