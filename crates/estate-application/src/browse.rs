//! Browse session: drives [`ListingState`] from identity changes and user
//! actions, and pairs each action with its remote call.
//!
//! Viewing and toggling are optimistic. The local state changes at once and
//! the remote write runs in a spawned task whose outcome is only logged; a
//! failed write is reconciled by the next full reload, never rolled back.
//! Removal is the exception: the entry disappears only after the remote
//! delete succeeded.
//!
//! Remote writes of one session run one at a time, in the order the local
//! changes were made.

use chrono::Utc;
use estate_core::error::EstateError;
use estate_core::gateway::DataGateway;
use estate_core::identity::Identity;
use estate_core::property::PropertyId;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, oneshot};
use tokio::task::JoinHandle;

use crate::identity::SessionProvider;
use crate::listing::{ListingError, ListingState, ReloadTicket, Snapshot, View};

/// Handle to a remote write started by an optimistic update.
///
/// Dropping it lets the write finish in the background.
#[derive(Debug)]
pub struct RemoteSync {
    handle: JoinHandle<()>,
}

impl RemoteSync {
    /// Waits for the remote write to finish.
    pub async fn settled(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!("[BrowseSession] Remote write task ended abnormally: {}", e);
        }
    }
}

/// Remote writes, chained so each starts after the previous one ended.
#[derive(Default)]
struct WriteQueue {
    tail: Mutex<Option<oneshot::Receiver<()>>>,
}

impl WriteQueue {
    /// Spawns `write` behind every write pushed before it.
    async fn push<F, T>(&self, write: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let previous = self.tail.lock().await.replace(done_rx);
        tokio::spawn(async move {
            if let Some(previous) = previous {
                // A closed channel means the previous write panicked; go on.
                let _ = previous.await;
            }
            let output = write.await;
            let _ = done_tx.send(());
            output
        })
    }
}

/// Fetches everything a full reload needs for `identity`.
///
/// Per-user lists are only fetched for authenticated users.
pub async fn load_snapshot(gateway: &dyn DataGateway, identity: &Identity) -> Snapshot {
    let properties = gateway.list_properties().await;
    if !matches!(identity, Identity::Authenticated(_)) {
        return Snapshot {
            properties,
            ..Snapshot::default()
        };
    }

    let view_history = gateway.list_view_history(identity).await;
    let favorites = gateway.list_favorites(identity).await;
    let ids: Vec<PropertyId> = properties.iter().map(|p| p.id.clone()).collect();
    let favorited = gateway.check_favorited(identity, &ids).await;
    Snapshot {
        properties,
        view_history,
        favorites,
        favorited,
    }
}

pub struct BrowseSession {
    gateway: Arc<dyn DataGateway>,
    provider: Arc<SessionProvider>,
    state: Arc<RwLock<ListingState>>,
    writes: WriteQueue,
}

impl BrowseSession {
    /// Creates a browse session with empty state.
    ///
    /// # Arguments
    ///
    /// * `gateway` - Remote data gateway
    /// * `provider` - Source of the current identity
    /// * `page_size` - Cards per page in the history and favorites views
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        provider: Arc<SessionProvider>,
        page_size: usize,
    ) -> Self {
        Self {
            gateway,
            provider,
            state: Arc::new(RwLock::new(ListingState::new(page_size))),
            writes: WriteQueue::default(),
        }
    }

    pub fn provider(&self) -> &Arc<SessionProvider> {
        &self.provider
    }

    /// Read access to the listing state for rendering.
    pub async fn state(&self) -> RwLockReadGuard<'_, ListingState> {
        self.state.read().await
    }

    /// Unconditionally reloads for `identity`. Returns `false` if a newer
    /// reload superseded this one before it finished.
    pub async fn reload(&self, identity: Identity) -> bool {
        let ticket = self.state.write().await.begin_reload(identity.clone());
        self.finish_reload(ticket, identity).await
    }

    /// Reloads if the provider's identity changed since the last reload.
    /// Returns whether a reload was applied.
    pub async fn sync_identity(&self) -> bool {
        let Some(identity) = self.provider.identity() else {
            return false;
        };
        match self.start_reload(&identity).await {
            Some(ticket) => self.finish_reload(ticket, identity).await,
            None => false,
        }
    }

    /// Spawns a task that reloads on every identity change, whatever its
    /// source. Each reload runs in its own task so a newer identity never
    /// waits for an older fetch; late results are discarded by ticket.
    pub fn watch_identity(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut changes = self.provider.subscribe();
        tokio::spawn(async move {
            loop {
                let identity = changes.borrow_and_update().identity().cloned();
                if let Some(identity) = identity {
                    if let Some(ticket) = this.start_reload(&identity).await {
                        let session = Arc::clone(&this);
                        tokio::spawn(async move {
                            session.finish_reload(ticket, identity).await;
                        });
                    }
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    async fn start_reload(&self, identity: &Identity) -> Option<ReloadTicket> {
        let mut state = self.state.write().await;
        if state.needs_reload(identity) {
            Some(state.begin_reload(identity.clone()))
        } else {
            None
        }
    }

    async fn finish_reload(&self, ticket: ReloadTicket, identity: Identity) -> bool {
        let snapshot = load_snapshot(self.gateway.as_ref(), &identity).await;
        self.state
            .write()
            .await
            .apply_snapshot(&ticket, snapshot, Utc::now())
    }

    /// Records a view locally and, for guest or signed-in users, remotely.
    ///
    /// Returns the remote write, if one was started.
    pub async fn view_property(&self, id: &PropertyId) -> Result<Option<RemoteSync>, ListingError> {
        let mut state = self.state.write().await;
        state.view_property(id, Utc::now())?;
        let identity = state.identity().clone();
        if identity.is_anonymous() {
            return Ok(None);
        }

        let gateway = Arc::clone(&self.gateway);
        let id = id.clone();
        let handle = self
            .writes
            .push(async move {
                if let Err(e) = gateway.record_view(&identity, &id).await {
                    tracing::warn!("[BrowseSession] View of {} not saved: {}", id, e);
                }
            })
            .await;
        Ok(Some(RemoteSync { handle }))
    }

    /// Flips the favorite flag locally and queues the remote toggle.
    ///
    /// Returns the new local flag and the remote write.
    pub async fn toggle_favorite(&self, id: &PropertyId) -> Result<(bool, RemoteSync), ListingError> {
        let mut state = self.state.write().await;
        let favorited = state.toggle_favorite(id, Utc::now())?;
        let identity = state.identity().clone();

        let gateway = Arc::clone(&self.gateway);
        let id = id.clone();
        let handle = self
            .writes
            .push(async move {
                match gateway.toggle_favorite(&identity, &id).await {
                    Ok(outcome) if identity.session().is_some() && outcome.favorited != favorited => {
                        tracing::warn!(
                            "[BrowseSession] Favorite {} is {} remotely but {} locally",
                            id,
                            outcome.favorited,
                            favorited
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("[BrowseSession] Favorite toggle for {} not saved: {}", id, e);
                    }
                }
            })
            .await;
        Ok((favorited, RemoteSync { handle }))
    }

    /// Asks for confirmation before removing a view-history entry.
    pub async fn request_removal(&self, id: &PropertyId) -> Result<(), ListingError> {
        self.state.write().await.request_removal(id)
    }

    pub async fn cancel_removal(&self) {
        self.state.write().await.cancel_removal();
    }

    /// Deletes the entry awaiting confirmation remotely, then locally.
    ///
    /// Returns whether an entry was removed from the list.
    ///
    /// # Errors
    ///
    /// [`ListingError::Remote`] when the remote delete failed; the list is
    /// left unchanged.
    pub async fn confirm_removal(&self) -> Result<bool, ListingError> {
        let (pending, delete) = {
            let mut state = self.state.write().await;
            let pending = state.confirm_removal()?;
            let identity = state.identity().clone();
            let gateway = Arc::clone(&self.gateway);
            let property_id = pending.property_id.clone();
            let delete = self
                .writes
                .push(async move { gateway.remove_view_history(&identity, &property_id).await })
                .await;
            (pending, delete)
        };

        let result = delete
            .await
            .unwrap_or_else(|e| Err(EstateError::internal(format!("Remote delete task failed: {}", e))));
        if let Err(e) = result {
            tracing::error!(
                "[BrowseSession] Removing {} from history failed: {}",
                pending.property_id,
                e
            );
            return Err(ListingError::Remote(e));
        }
        Ok(self.state.write().await.apply_removal(&pending))
    }

    pub async fn switch_view(&self, view: View) -> Result<(), ListingError> {
        self.state.write().await.switch_view(view)
    }

    pub async fn change_page(&self, page: usize) -> Result<(), ListingError> {
        self.state.write().await.change_page(page)
    }
}
