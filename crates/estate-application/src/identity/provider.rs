use estate_core::auth::{AuthBackend, SignUpOutcome};
use estate_core::error::Result;
use estate_core::identity::Identity;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::state::{SessionEvent, SessionState, transition};

/// Owns the current [`SessionState`] and the calls that change it.
///
/// State is published through a `watch` channel so any number of
/// consumers can react to identity changes, whether they come from an
/// explicit call or from the auth service.
pub struct SessionProvider {
    auth: Arc<dyn AuthBackend>,
    state: Arc<watch::Sender<SessionState>>,
    redirect_url: Option<String>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionProvider {
    /// Creates a provider in the [`SessionState::Unresolved`] state.
    ///
    /// # Arguments
    ///
    /// * `auth` - The authentication backend
    /// * `redirect_url` - Where sign-up confirmation links send the user
    pub fn new(auth: Arc<dyn AuthBackend>, redirect_url: Option<String>) -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        Self {
            auth,
            state: Arc::new(state),
            redirect_url,
            listener: Mutex::new(None),
        }
    }

    /// Runs the startup session check and starts listening for changes
    /// pushed by the auth service.
    ///
    /// A failed check is logged and resolves to anonymous.
    pub async fn initialize(&self) -> Identity {
        // Subscribe before checking so no change between the two is lost.
        let mut changes = self.auth.subscribe();

        let event = match self.auth.get_session().await {
            Ok(session) => SessionEvent::SessionChecked(session),
            Err(e) => {
                tracing::error!("[SessionProvider] Session check failed: {}", e);
                SessionEvent::SessionCheckFailed
            }
        };
        let identity = apply(&self.state, event);
        tracing::info!("[SessionProvider] Session resolved: {:?}", identity.key());

        let state = self.state.clone();
        let handle = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        tracing::debug!("[SessionProvider] Auth change: {:?}", change.event);
                        apply(&state, SessionEvent::External(change.session));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[SessionProvider] Missed {} auth change(s)", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(previous) = listener.replace(handle) {
                previous.abort();
            }
        }

        identity
    }

    /// Current state.
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Current identity, `None` while unresolved.
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the auth service's error unchanged; the state is untouched.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => Ok(apply(&self.state, SessionEvent::SignedIn(session))),
            Err(e) => {
                tracing::warn!("[SessionProvider] Sign-in failed: {}", e);
                Err(e)
            }
        }
    }

    /// Creates an account. Does not change the current identity; the user
    /// signs in separately once the account is confirmed.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        self.auth
            .sign_up(email, password, self.redirect_url.as_deref())
            .await
            .inspect_err(|e| tracing::warn!("[SessionProvider] Sign-up failed: {}", e))
    }

    /// Switches to the guest identity, whatever the current state.
    pub fn enable_guest_mode(&self) -> Identity {
        tracing::info!("[SessionProvider] Guest mode enabled");
        apply(&self.state, SessionEvent::GuestEnabled)
    }

    /// Leaves guest mode locally, or signs out of the auth service.
    ///
    /// # Errors
    ///
    /// Returns the auth service's error; the state is untouched.
    pub async fn sign_out(&self) -> Result<()> {
        let is_guest = matches!(self.current(), SessionState::Resolved(Identity::Guest));
        if !is_guest {
            self.auth
                .sign_out()
                .await
                .inspect_err(|e| tracing::warn!("[SessionProvider] Sign-out failed: {}", e))?;
        }
        apply(&self.state, SessionEvent::SignedOut);
        Ok(())
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

/// Applies `event` and returns the resulting identity. Receivers are only
/// woken when the state actually changed.
fn apply(state: &watch::Sender<SessionState>, event: SessionEvent) -> Identity {
    let mut identity = Identity::Anonymous;
    state.send_if_modified(|current| {
        let next = transition(current, event);
        if let SessionState::Resolved(resolved) = &next {
            identity = resolved.clone();
        }
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
    identity
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use estate_core::auth::{AuthChange, SessionChanges};
    use estate_core::error::EstateError;
    use estate_core::identity::{AuthSession, AuthUser};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Auth backend that counts sign-out calls and can be told to fail.
    struct MockAuth {
        session: Mutex<Option<AuthSession>>,
        fail_check: bool,
        fail_sign_out: bool,
        sign_outs: AtomicUsize,
        changes: broadcast::Sender<AuthChange>,
    }

    impl MockAuth {
        fn new() -> Self {
            let (changes, _) = broadcast::channel(8);
            Self {
                session: Mutex::new(None),
                fail_check: false,
                fail_sign_out: false,
                sign_outs: AtomicUsize::new(0),
                changes,
            }
        }
    }

    fn session(id: &str) -> AuthSession {
        AuthSession {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: id.to_string(),
                email: None,
                avatar_url: None,
            },
        }
    }

    #[async_trait]
    impl AuthBackend for MockAuth {
        async fn get_session(&self) -> Result<Option<AuthSession>> {
            if self.fail_check {
                return Err(EstateError::network("offline"));
            }
            Ok(self.session.lock().unwrap().clone())
        }

        async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
            if password != "secret1" {
                return Err(EstateError::auth("Invalid login credentials"));
            }
            let session = session(email);
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(session)
        }

        async fn sign_up(
            &self,
            _email: &str,
            _password: &str,
            redirect_to: Option<&str>,
        ) -> Result<SignUpOutcome> {
            assert_eq!(redirect_to, Some("https://app.example"));
            Ok(SignUpOutcome::ConfirmationRequired)
        }

        async fn sign_out(&self) -> Result<()> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_out {
                return Err(EstateError::auth("Sign-out failed"));
            }
            *self.session.lock().unwrap() = None;
            Ok(())
        }

        fn subscribe(&self) -> SessionChanges {
            self.changes.subscribe()
        }
    }

    fn provider(auth: Arc<MockAuth>) -> SessionProvider {
        SessionProvider::new(auth, Some("https://app.example".to_string()))
    }

    #[tokio::test]
    async fn test_initialize_without_session() {
        let provider = provider(Arc::new(MockAuth::new()));
        assert_eq!(provider.current(), SessionState::Unresolved);
        assert_eq!(provider.initialize().await, Identity::Anonymous);
        assert!(provider.current().is_resolved());
    }

    #[tokio::test]
    async fn test_failed_session_check_defaults_to_anonymous() {
        let mut auth = MockAuth::new();
        auth.fail_check = true;
        let provider = provider(Arc::new(auth));
        assert_eq!(provider.initialize().await, Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_sign_in_success_and_failure() {
        let provider = provider(Arc::new(MockAuth::new()));
        provider.initialize().await;

        let err = provider.sign_in("jane", "wrong").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid login credentials");
        assert_eq!(provider.identity(), Some(Identity::Anonymous));

        let identity = provider.sign_in("jane", "secret1").await.unwrap();
        assert_eq!(identity, Identity::Authenticated(session("jane")));
    }

    #[tokio::test]
    async fn test_sign_up_does_not_sign_in() {
        let provider = provider(Arc::new(MockAuth::new()));
        provider.initialize().await;
        let outcome = provider.sign_up("new@example.com", "secret1").await.unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
        assert_eq!(provider.identity(), Some(Identity::Anonymous));
    }

    #[tokio::test]
    async fn test_guest_sign_out_skips_backend() {
        let auth = Arc::new(MockAuth::new());
        let provider = provider(auth.clone());
        provider.initialize().await;

        assert_eq!(provider.enable_guest_mode(), Identity::Guest);
        provider.sign_out().await.unwrap();
        assert_eq!(provider.identity(), Some(Identity::Anonymous));
        assert_eq!(auth.sign_outs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_sign_out_keeps_identity() {
        let mut auth = MockAuth::new();
        auth.fail_sign_out = true;
        let auth = Arc::new(auth);
        let provider = provider(auth.clone());
        provider.initialize().await;
        provider.sign_in("jane", "secret1").await.unwrap();

        assert!(provider.sign_out().await.is_err());
        assert_eq!(
            provider.identity(),
            Some(Identity::Authenticated(session("jane")))
        );
        assert_eq!(auth.sign_outs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_external_change_updates_state() {
        let auth = Arc::new(MockAuth::new());
        let provider = provider(auth.clone());
        provider.initialize().await;
        let mut rx = provider.subscribe();

        auth.changes
            .send(AuthChange::signed_in(session("remote")))
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            provider.identity(),
            Some(Identity::Authenticated(session("remote")))
        );

        auth.changes.send(AuthChange::signed_out()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(provider.identity(), Some(Identity::Anonymous));
    }
}
