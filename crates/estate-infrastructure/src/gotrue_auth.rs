//! Auth backend over the hosted GoTrue endpoint (`/auth/v1`).

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use estate_core::auth::{AuthBackend, AuthChange, AuthEvent, SessionChanges, SignUpOutcome};
use estate_core::error::{EstateError, Result};
use estate_core::identity::{AuthSession, AuthUser};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

use crate::config::BackendConfig;
use crate::postgrest_store::{AccessToken, error_message};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

impl From<UserResponse> for AuthUser {
    fn from(user: UserResponse) -> Self {
        AuthUser {
            id: user.id,
            email: user.email,
            avatar_url: user.user_metadata.and_then(|m| m.avatar_url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + ChronoDuration::seconds(secs)));
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Client for the hosted authentication service.
///
/// Holds the current session in memory and mirrors its access token into
/// the shared [`AccessToken`] used by the table store.
pub struct GoTrueAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
    token: AccessToken,
    session: RwLock<Option<AuthSession>>,
    changes: broadcast::Sender<AuthChange>,
}

impl GoTrueAuth {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        token: AccessToken,
        timeout: Duration,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            timeout,
            token,
            session: RwLock::new(None),
            changes,
        }
    }

    pub fn from_config(config: &BackendConfig, token: AccessToken) -> Result<Self> {
        let (url, key) = config.credentials().ok_or_else(|| {
            EstateError::config("Backend is not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY.")
        })?;
        Ok(Self::new(url, key, token, config.timeout()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key).timeout(self.timeout)
    }

    async fn store_session(&self, session: Option<AuthSession>, event: AuthEvent) {
        self.token
            .set(session.as_ref().map(|s| s.access_token.clone()))
            .await;
        *self.session.write().await = session.clone();
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(AuthChange { event, session });
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        let response = self
            .prepare(self.client.post(self.endpoint("token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| EstateError::network(e.to_string()))?;
        let body = auth_body(response).await?;
        let token: TokenResponse = serde_json::from_value(body)?;
        Ok(token.into_session(Utc::now()))
    }
}

/// Returns the JSON body of a successful response, or the service's error
/// message verbatim as [`EstateError::Auth`].
async fn auth_body(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| EstateError::network(e.to_string()))?;
    if !status.is_success() {
        let message = error_message(&text)
            .unwrap_or_else(|| format!("Authentication request failed ({})", status.as_u16()));
        return Err(EstateError::auth(message));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Interprets a sign-up response: a token means the account was confirmed
/// immediately, a bare user means confirmation is pending.
fn sign_up_outcome(body: Value, now: DateTime<Utc>) -> Result<SignUpOutcome> {
    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body)?;
        Ok(SignUpOutcome::SignedIn(token.into_session(now)))
    } else {
        Ok(SignUpOutcome::ConfirmationRequired)
    }
}

#[async_trait]
impl AuthBackend for GoTrueAuth {
    async fn get_session(&self) -> Result<Option<AuthSession>> {
        let current = self.session.read().await.clone();
        let Some(session) = current else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            tracing::info!("[GoTrueAuth] Session expired without refresh token");
            self.store_session(None, AuthEvent::SignedOut).await;
            return Ok(None);
        };

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                tracing::debug!("[GoTrueAuth] Session refreshed for user {}", refreshed.user.id);
                self.store_session(Some(refreshed.clone()), AuthEvent::TokenRefreshed)
                    .await;
                Ok(Some(refreshed))
            }
            Err(e) => {
                tracing::warn!("[GoTrueAuth] Session refresh failed: {}", e);
                self.store_session(None, AuthEvent::SignedOut).await;
                Err(e)
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .prepare(self.client.post(self.endpoint("token")))
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials { email, password })
            .send()
            .await
            .map_err(|e| EstateError::network(e.to_string()))?;
        let body = auth_body(response).await?;
        let token: TokenResponse = serde_json::from_value(body)?;
        let session = token.into_session(Utc::now());

        tracing::info!("[GoTrueAuth] Signed in user {}", session.user.id);
        self.store_session(Some(session.clone()), AuthEvent::SignedIn)
            .await;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome> {
        let mut request = self
            .prepare(self.client.post(self.endpoint("signup")))
            .json(&PasswordCredentials { email, password });
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| EstateError::network(e.to_string()))?;
        let body = auth_body(response).await?;
        let outcome = sign_up_outcome(body, Utc::now())?;
        // An immediately confirmed account is not signed in here; the user
        // signs in explicitly afterwards.
        tracing::info!("[GoTrueAuth] Sign-up accepted for {}", email);
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<()> {
        let current = self.session.read().await.clone();
        if let Some(session) = current {
            let response = self
                .prepare(self.client.post(self.endpoint("logout")))
                .header("Authorization", format!("Bearer {}", session.access_token))
                .send()
                .await
                .map_err(|e| EstateError::network(e.to_string()))?;
            auth_body(response).await?;
        }
        self.store_session(None, AuthEvent::SignedOut).await;
        tracing::info!("[GoTrueAuth] Signed out");
        Ok(())
    }

    fn subscribe(&self) -> SessionChanges {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_response_into_session() {
        let now: DateTime<Utc> = "2025-05-01T12:00:00Z".parse().unwrap();
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "refresh_token": "r1",
            "expires_in": 3600,
            "user": {
                "id": "6f1c",
                "email": "jane@example.com",
                "user_metadata": {"avatar_url": "https://cdn/a.png"}
            }
        }))
        .unwrap();
        let session = token.into_session(now);
        assert_eq!(session.user.id, "6f1c");
        assert_eq!(session.user.avatar_url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(session.expires_at, Some(now + ChronoDuration::seconds(3600)));
    }

    #[test]
    fn test_absolute_expiry_wins() {
        let now = Utc::now();
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "expires_in": 3600,
            "expires_at": 1_700_000_000,
            "user": {"id": "u"}
        }))
        .unwrap();
        let session = token.into_session(now);
        assert_eq!(session.expires_at, DateTime::from_timestamp(1_700_000_000, 0));
    }

    #[test]
    fn test_sign_up_outcomes() {
        let pending = sign_up_outcome(json!({"id": "u1", "email": "a@b.c"}), Utc::now()).unwrap();
        assert_eq!(pending, SignUpOutcome::ConfirmationRequired);

        let confirmed = sign_up_outcome(
            json!({"access_token": "jwt", "user": {"id": "u1"}}),
            Utc::now(),
        )
        .unwrap();
        assert!(matches!(confirmed, SignUpOutcome::SignedIn(s) if s.user.id == "u1"));
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_local() {
        let token = AccessToken::new();
        token.set(Some("stale".to_string())).await;
        let auth = GoTrueAuth::new("http://127.0.0.1:9", "anon", token.clone(), Duration::from_secs(1));
        let mut changes = auth.subscribe();

        auth.sign_out().await.unwrap();
        assert_eq!(token.get().await, None);
        assert_eq!(changes.recv().await.unwrap(), AuthChange::signed_out());
        assert_eq!(auth.get_session().await.unwrap(), None);
    }
}
