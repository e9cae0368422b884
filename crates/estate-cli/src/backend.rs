//! Wires the gateway and auth backend for either the hosted service or the
//! offline demo.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use estate_core::auth::AuthBackend;
use estate_core::gateway::DataGateway;
use estate_core::store::Table;
use estate_infrastructure::catalog::seed_demo_catalog;
use estate_infrastructure::config::AppConfig;
use estate_infrastructure::{
    AccessToken, GoTrueAuth, MemoryAuth, MemoryStore, PostgrestStore, StoreGateway,
};
use serde_json::json;
use std::sync::Arc;

/// Account available in offline mode.
pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "demo-password";

// (property id, hours ago)
const DEMO_HISTORY: &[(i64, i64)] = &[(3, 1), (7, 5), (1, 26), (12, 50), (9, 73)];
const DEMO_FAVORITES: &[(i64, i64)] = &[(5, 2), (11, 30), (3, 80)];

pub struct Backend {
    pub gateway: Arc<dyn DataGateway>,
    pub auth: Arc<dyn AuthBackend>,
    pub redirect_url: Option<String>,
    pub offline: bool,
}

impl Backend {
    /// Hosted backend when configured and not forced offline; the demo
    /// backend otherwise.
    pub fn connect(config: &AppConfig, force_offline: bool) -> Result<Self> {
        if force_offline {
            return Self::offline();
        }
        if !config.backend.is_configured() {
            tracing::warn!("[Backend] No backend configured, using the offline demo catalogue");
            return Self::offline();
        }
        Self::online(config)
    }

    fn online(config: &AppConfig) -> Result<Self> {
        let token = AccessToken::new();
        let store = PostgrestStore::from_config(&config.backend, token.clone())
            .context("Failed to create store client")?;
        let auth = GoTrueAuth::from_config(&config.backend, token)
            .context("Failed to create auth client")?;
        tracing::info!("[Backend] Using hosted backend");
        Ok(Self {
            gateway: Arc::new(StoreGateway::new(Arc::new(store))),
            auth: Arc::new(auth),
            redirect_url: config.backend.redirect_url.clone(),
            offline: false,
        })
    }

    /// In-memory store with the demo catalogue and a demo account.
    pub fn offline() -> Result<Self> {
        let store = MemoryStore::new();
        seed_demo_catalog(&store).context("Failed to seed demo catalogue")?;

        let auth = MemoryAuth::with_auto_confirm();
        let user = auth
            .register(DEMO_EMAIL, DEMO_PASSWORD)
            .context("Failed to register demo account")?;
        seed_demo_lists(&store, &user.id)?;

        tracing::debug!("[Backend] Offline demo ready for {}", DEMO_EMAIL);
        Ok(Self {
            gateway: Arc::new(StoreGateway::new(Arc::new(store))),
            auth: Arc::new(auth),
            redirect_url: None,
            offline: true,
        })
    }
}

fn seed_demo_lists(store: &MemoryStore, user_id: &str) -> Result<()> {
    let now = Utc::now();
    let history = DEMO_HISTORY.iter().map(|(property_id, hours)| {
        json!({
            "user_id": user_id,
            "property_id": property_id,
            "viewed_at": now - Duration::hours(*hours),
        })
    });
    store
        .seed(Table::ViewHistory, history)
        .context("Failed to seed demo view history")?;

    let favorites = DEMO_FAVORITES.iter().map(|(property_id, hours)| {
        json!({
            "user_id": user_id,
            "property_id": property_id,
            "favorited_at": now - Duration::hours(*hours),
        })
    });
    store
        .seed(Table::Favorites, favorites)
        .context("Failed to seed demo favorites")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::identity::Identity;

    #[tokio::test]
    async fn test_unconfigured_backend_falls_back_to_offline() {
        let backend = Backend::connect(&AppConfig::default(), false).unwrap();
        assert!(backend.offline);
        assert_eq!(backend.gateway.list_properties().await.len(), 18);
    }

    #[tokio::test]
    async fn test_demo_account_has_lists() {
        let backend = Backend::offline().unwrap();
        let session = backend
            .auth
            .sign_in_with_password(DEMO_EMAIL, DEMO_PASSWORD)
            .await
            .unwrap();
        let identity = Identity::Authenticated(session);

        let history = backend.gateway.list_view_history(&identity).await;
        let ids: Vec<&str> = history.iter().map(|e| e.property.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "7", "1", "12", "9"]);

        let favorites = backend.gateway.list_favorites(&identity).await;
        assert_eq!(favorites.len(), 3);
        assert_eq!(favorites[0].property.id.as_str(), "5");
    }
}
