//! Remote data gateway interface.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::identity::Identity;
use crate::property::{FavoriteEntry, Property, PropertyId, ViewHistoryEntry};

/// Outcome of a favorite toggle on the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub favorited: bool,
}

/// Reads and writes of listings, view history and favorites.
///
/// Reads never fail: a failed read is logged and yields an empty result so
/// the UI can always render. Writes return a failure carrying a message
/// instead of panicking or propagating transport errors as-is.
///
/// Every per-user operation is a no-op success for [`Identity::Guest`] and
/// fails with [`crate::EstateError::Unauthenticated`] (writes) or returns
/// empty (reads) for [`Identity::Anonymous`].
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// All listings, ordered by id, each with its primary image.
    async fn list_properties(&self) -> Vec<Property>;

    /// The user's view history, most recent first.
    async fn list_view_history(&self, identity: &Identity) -> Vec<ViewHistoryEntry>;

    /// The user's favorites, most recent first.
    async fn list_favorites(&self, identity: &Identity) -> Vec<FavoriteEntry>;

    /// Favorite flags for the given listings; only favorited ids appear.
    async fn check_favorited(
        &self,
        identity: &Identity,
        property_ids: &[PropertyId],
    ) -> HashMap<PropertyId, bool>;

    /// Upserts the (user, property) view record with a fresh timestamp.
    async fn record_view(&self, identity: &Identity, property_id: &PropertyId) -> Result<()>;

    /// Flips presence of the (user, property) favorite record.
    async fn toggle_favorite(
        &self,
        identity: &Identity,
        property_id: &PropertyId,
    ) -> Result<ToggleOutcome>;

    /// Deletes the (user, property) view record; deleting nothing succeeds.
    async fn remove_view_history(&self, identity: &Identity, property_id: &PropertyId)
    -> Result<()>;
}
