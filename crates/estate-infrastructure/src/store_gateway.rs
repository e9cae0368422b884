//! `DataGateway` implementation over a table store.
//!
//! Joins are done client-side (rows first, then the referenced properties,
//! then their images), so the hosted store and the in-memory store give the
//! same results.

use async_trait::async_trait;
use chrono::Utc;
use estate_core::error::{EstateError, Result};
use estate_core::gateway::{DataGateway, ToggleOutcome};
use estate_core::identity::Identity;
use estate_core::property::{
    DEFAULT_CATALOG_IMAGE, FavoriteEntry, PLACEHOLDER_IMAGE, Property, PropertyId,
    ViewHistoryEntry,
};
use estate_core::store::{Filter, Query, StoreBackend, Table};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::dto::{
    FavoriteRow, NewFavoriteRow, NewViewHistoryRow, PropertyImageRow, ViewHistoryRow,
    attach_images, decode_rows,
};

/// Who a per-user call acts for.
enum Actor<'a> {
    Anonymous,
    Guest,
    User(&'a str),
}

fn actor(identity: &Identity) -> Actor<'_> {
    match identity {
        Identity::Anonymous => Actor::Anonymous,
        Identity::Guest => Actor::Guest,
        Identity::Authenticated(session) => Actor::User(&session.user.id),
    }
}

fn id_values(ids: &[PropertyId]) -> Vec<String> {
    ids.iter().map(|id| id.as_str().to_string()).collect()
}

fn user_property_filter(user_id: &str, property_id: &PropertyId) -> Filter {
    Filter::new()
        .eq("user_id", user_id)
        .eq("property_id", property_id.as_str())
}

/// Data gateway backed by any [`StoreBackend`].
#[derive(Clone)]
pub struct StoreGateway {
    store: Arc<dyn StoreBackend>,
}

impl StoreGateway {
    pub fn new(store: Arc<dyn StoreBackend>) -> Self {
        Self { store }
    }

    async fn fetch_properties(&self) -> Result<Vec<Property>> {
        let rows = self
            .store
            .select(Table::Properties, &Query::new().order_by("id", true))
            .await?;
        let properties: Vec<Property> = decode_rows(rows)?;
        let ids: Vec<PropertyId> = properties.iter().map(|p| p.id.clone()).collect();
        let images = self.fetch_images(&ids).await;
        Ok(attach_images(properties, &images, DEFAULT_CATALOG_IMAGE))
    }

    /// Listings referenced by history/favorite rows, keyed by id.
    async fn fetch_properties_by_id(
        &self,
        ids: &[PropertyId],
    ) -> Result<HashMap<PropertyId, Property>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .store
            .select(
                Table::Properties,
                &Query::new().is_in("id", id_values(ids)),
            )
            .await?;
        let properties: Vec<Property> = decode_rows(rows)?;
        let images = self.fetch_images(ids).await;
        Ok(attach_images(properties, &images, PLACEHOLDER_IMAGE)
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect())
    }

    /// Image rows for `ids`; a failure only costs the images.
    async fn fetch_images(&self, ids: &[PropertyId]) -> Vec<PropertyImageRow> {
        if ids.is_empty() {
            return Vec::new();
        }
        let query = Query::new()
            .is_in("property_id", id_values(ids))
            .order_by("id", true);
        let result = match self.store.select(Table::PropertyImages, &query).await {
            Ok(rows) => decode_rows(rows),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!("[StoreGateway] Failed to load property images: {}", e);
            Vec::new()
        })
    }

    async fn fetch_view_history(&self, user_id: &str) -> Result<Vec<ViewHistoryEntry>> {
        let rows = self
            .store
            .select(
                Table::ViewHistory,
                &Query::new()
                    .eq("user_id", user_id)
                    .order_by("viewed_at", false),
            )
            .await?;
        let rows: Vec<ViewHistoryRow> = decode_rows(rows)?;
        let ids: Vec<PropertyId> = rows.iter().map(|r| r.property_id.clone()).collect();
        let properties = self.fetch_properties_by_id(&ids).await?;

        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|row| seen.insert(row.property_id.clone()))
            .filter_map(|row| {
                properties
                    .get(&row.property_id)
                    .map(|p| ViewHistoryEntry::new(p.clone(), row.viewed_at))
            })
            .collect())
    }

    async fn fetch_favorites(&self, user_id: &str) -> Result<Vec<FavoriteEntry>> {
        let rows = self
            .store
            .select(
                Table::Favorites,
                &Query::new()
                    .eq("user_id", user_id)
                    .order_by("favorited_at", false),
            )
            .await?;
        let rows: Vec<FavoriteRow> = decode_rows(rows)?;
        let ids: Vec<PropertyId> = rows.iter().map(|r| r.property_id.clone()).collect();
        let properties = self.fetch_properties_by_id(&ids).await?;

        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|row| seen.insert(row.property_id.clone()))
            .filter_map(|row| {
                properties
                    .get(&row.property_id)
                    .map(|p| FavoriteEntry::new(p.clone(), row.favorited_at))
            })
            .collect())
    }

    async fn fetch_favorited(
        &self,
        user_id: &str,
        ids: &[PropertyId],
    ) -> Result<HashMap<PropertyId, bool>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .store
            .select(
                Table::Favorites,
                &Query::new()
                    .eq("user_id", user_id)
                    .is_in("property_id", id_values(ids)),
            )
            .await?;
        let rows: Vec<FavoriteRow> = decode_rows(rows)?;
        Ok(rows.into_iter().map(|r| (r.property_id, true)).collect())
    }

    async fn upsert_view(&self, user_id: &str, property_id: &PropertyId) -> Result<()> {
        let filter = user_property_filter(user_id, property_id);
        let now = Utc::now();
        let existing = self
            .store
            .select(Table::ViewHistory, &Query::new().filter(filter.clone()).limit(1))
            .await?;

        if existing.is_empty() {
            let row = NewViewHistoryRow {
                user_id,
                property_id,
                viewed_at: now,
            };
            self.store
                .insert(Table::ViewHistory, serde_json::to_value(&row)?)
                .await?;
        } else {
            self.store
                .update(Table::ViewHistory, &filter, json!({ "viewed_at": now }))
                .await?;
        }
        Ok(())
    }

    async fn flip_favorite(&self, user_id: &str, property_id: &PropertyId) -> Result<ToggleOutcome> {
        let filter = user_property_filter(user_id, property_id);
        let existing = self
            .store
            .select(Table::Favorites, &Query::new().filter(filter.clone()).limit(1))
            .await?;

        if existing.is_empty() {
            let row = NewFavoriteRow {
                user_id,
                property_id,
                favorited_at: Utc::now(),
            };
            self.store
                .insert(Table::Favorites, serde_json::to_value(&row)?)
                .await?;
            Ok(ToggleOutcome { favorited: true })
        } else {
            self.store.delete(Table::Favorites, &filter).await?;
            Ok(ToggleOutcome { favorited: false })
        }
    }
}

fn log_write_failure(operation: &str, property_id: &PropertyId, err: &EstateError) {
    tracing::error!(
        "[StoreGateway] {} failed for property {}: {}",
        operation,
        property_id,
        err
    );
}

#[async_trait]
impl DataGateway for StoreGateway {
    async fn list_properties(&self) -> Vec<Property> {
        match self.fetch_properties().await {
            Ok(properties) => {
                tracing::debug!("[StoreGateway] Loaded {} properties", properties.len());
                properties
            }
            Err(e) => {
                tracing::error!("[StoreGateway] Failed to load properties: {}", e);
                Vec::new()
            }
        }
    }

    async fn list_view_history(&self, identity: &Identity) -> Vec<ViewHistoryEntry> {
        let Actor::User(user_id) = actor(identity) else {
            return Vec::new();
        };
        self.fetch_view_history(user_id).await.unwrap_or_else(|e| {
            tracing::error!("[StoreGateway] Failed to load view history: {}", e);
            Vec::new()
        })
    }

    async fn list_favorites(&self, identity: &Identity) -> Vec<FavoriteEntry> {
        let Actor::User(user_id) = actor(identity) else {
            return Vec::new();
        };
        self.fetch_favorites(user_id).await.unwrap_or_else(|e| {
            tracing::error!("[StoreGateway] Failed to load favorites: {}", e);
            Vec::new()
        })
    }

    async fn check_favorited(
        &self,
        identity: &Identity,
        property_ids: &[PropertyId],
    ) -> HashMap<PropertyId, bool> {
        let Actor::User(user_id) = actor(identity) else {
            return HashMap::new();
        };
        self.fetch_favorited(user_id, property_ids)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("[StoreGateway] Failed to check favorites: {}", e);
                HashMap::new()
            })
    }

    async fn record_view(&self, identity: &Identity, property_id: &PropertyId) -> Result<()> {
        match actor(identity) {
            Actor::Guest => Ok(()),
            Actor::Anonymous => Err(EstateError::Unauthenticated),
            Actor::User(user_id) => self
                .upsert_view(user_id, property_id)
                .await
                .inspect_err(|e| log_write_failure("Recording view", property_id, e)),
        }
    }

    async fn toggle_favorite(
        &self,
        identity: &Identity,
        property_id: &PropertyId,
    ) -> Result<ToggleOutcome> {
        match actor(identity) {
            Actor::Guest => Ok(ToggleOutcome { favorited: true }),
            Actor::Anonymous => Err(EstateError::Unauthenticated),
            Actor::User(user_id) => self
                .flip_favorite(user_id, property_id)
                .await
                .inspect_err(|e| log_write_failure("Toggling favorite", property_id, e)),
        }
    }

    async fn remove_view_history(
        &self,
        identity: &Identity,
        property_id: &PropertyId,
    ) -> Result<()> {
        match actor(identity) {
            Actor::Guest => Ok(()),
            Actor::Anonymous => Err(EstateError::Unauthenticated),
            Actor::User(user_id) => {
                let removed = self
                    .store
                    .delete(Table::ViewHistory, &user_property_filter(user_id, property_id))
                    .await
                    .inspect_err(|e| log_write_failure("Removing view", property_id, e))?;
                tracing::debug!(
                    "[StoreGateway] Removed {} view record(s) for property {}",
                    removed,
                    property_id
                );
                Ok(())
            }
        }
    }
}
