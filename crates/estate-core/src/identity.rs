//! User identity: anonymous, guest, or an authenticated backend session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier reported for the guest identity in logs and profile output.
///
/// Never used for branching: code matches on [`Identity::Guest`].
pub const GUEST_USER_ID: &str = "guest-user-id";

/// Email shown on the guest profile.
pub const GUEST_EMAIL: &str = "guest@example.com";

/// A user record as issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// An authenticated backend session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Who is using the application right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// No session.
    #[default]
    Anonymous,
    /// Synthetic, never persisted.
    Guest,
    Authenticated(AuthSession),
}

/// Equality key for identities: two identities with the same key own the
/// same view-history and favorites data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Anonymous,
    Guest,
    User(String),
}

impl Identity {
    pub fn key(&self) -> IdentityKey {
        match self {
            Identity::Anonymous => IdentityKey::Anonymous,
            Identity::Guest => IdentityKey::Guest,
            Identity::Authenticated(session) => IdentityKey::User(session.user.id.clone()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest)
    }

    /// Guest or authenticated.
    pub fn is_signed_in(&self) -> bool {
        !self.is_anonymous()
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            Identity::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Profile shown in the header, `None` when anonymous.
    pub fn profile(&self) -> Option<UserProfile> {
        match self {
            Identity::Anonymous => None,
            Identity::Guest => Some(UserProfile {
                user_id: GUEST_USER_ID.to_string(),
                email: Some(GUEST_EMAIL.to_string()),
                display_name: "Guest User".to_string(),
                initials: "G".to_string(),
                avatar_url: None,
                is_guest: true,
            }),
            Identity::Authenticated(session) => {
                let email = session.user.email.clone();
                let display_name = email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
                    .unwrap_or("User")
                    .to_string();
                let initials = email
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .map(|e| e.chars().take(2).collect::<String>().to_uppercase())
                    .unwrap_or_else(|| "U".to_string());
                Some(UserProfile {
                    user_id: session.user.id.clone(),
                    email,
                    display_name,
                    initials,
                    avatar_url: session.user.avatar_url.clone(),
                    is_guest: false,
                })
            }
        }
    }
}

/// Header/profile presentation of the current identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub initials: String,
    pub avatar_url: Option<String>,
    pub is_guest: bool,
}

impl UserProfile {
    pub fn sign_out_label(&self) -> &'static str {
        if self.is_guest {
            "Exit Guest Mode"
        } else {
            "Sign out"
        }
    }
}
