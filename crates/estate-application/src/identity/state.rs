//! Session state and its transition function.

use estate_core::identity::{AuthSession, Identity};

/// What the application knows about the current user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The initial session check has not completed.
    #[default]
    Unresolved,
    Resolved(Identity),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Unresolved => None,
            SessionState::Resolved(identity) => Some(identity),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, SessionState::Resolved(_))
    }

    fn is_guest(&self) -> bool {
        matches!(self, SessionState::Resolved(Identity::Guest))
    }
}

/// Inputs to [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The startup session check returned.
    SessionChecked(Option<AuthSession>),
    /// The startup session check failed.
    SessionCheckFailed,
    /// Explicit sign-in succeeded.
    SignedIn(AuthSession),
    GuestEnabled,
    /// Explicit sign-out (or guest exit) succeeded.
    SignedOut,
    /// The auth service reported a change on its own.
    External(Option<AuthSession>),
}

/// Computes the next session state.
///
/// A guest stays a guest when the auth service reports "no session":
/// guest mode never had a backend session to lose.
pub fn transition(state: &SessionState, event: SessionEvent) -> SessionState {
    let identity = match event {
        SessionEvent::SessionChecked(Some(session))
        | SessionEvent::SignedIn(session)
        | SessionEvent::External(Some(session)) => Identity::Authenticated(session),
        SessionEvent::SessionChecked(None)
        | SessionEvent::SessionCheckFailed
        | SessionEvent::External(None) => {
            // Leaving guest mode takes an explicit sign-out.
            if state.is_guest() {
                Identity::Guest
            } else {
                Identity::Anonymous
            }
        }
        SessionEvent::GuestEnabled => Identity::Guest,
        SessionEvent::SignedOut => Identity::Anonymous,
    };
    SessionState::Resolved(identity)
}
