//! In-memory listing state and its reconciliation rules.
//!
//! `ListingState` owns the catalogue, the view history, the favorites list
//! and the favorited set for the current identity. Every method is
//! synchronous; remote calls are issued by the caller around them.

use chrono::{DateTime, Utc};
use estate_core::identity::{Identity, IdentityKey};
use estate_core::pagination::{self, PageControl, PageCursor};
use estate_core::property::{FavoriteEntry, FavoritedSet, Property, PropertyId, ViewHistoryEntry};
use std::collections::HashMap;

use super::error::ListingError;
use super::guest_seed::{seed_favorites, seed_view_history};

/// The view the shell renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Main,
    ViewHistory,
    Favorites,
}

impl View {
    /// History and favorites need a guest or signed-in identity.
    pub fn requires_identity(self) -> bool {
        !matches!(self, View::Main)
    }
}

/// Issued by [`ListingState::begin_reload`]; results carrying an outdated
/// ticket are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadTicket {
    generation: u64,
    key: IdentityKey,
}

impl ReloadTicket {
    pub fn key(&self) -> &IdentityKey {
        &self.key
    }
}

/// Everything a full reload fetched from the gateway.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub properties: Vec<Property>,
    pub view_history: Vec<ViewHistoryEntry>,
    pub favorites: Vec<FavoriteEntry>,
    pub favorited: HashMap<PropertyId, bool>,
}

/// A confirmed removal waiting for the remote delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRemoval {
    pub property_id: PropertyId,
    generation: u64,
}

/// Pagination data for the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub total_pages: usize,
    pub controls: Vec<PageControl>,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Last entry removed by a toggle, so toggling it straight back restores
/// its position and timestamp.
#[derive(Debug, Clone)]
struct Unfavorited {
    index: usize,
    entry: FavoriteEntry,
}

#[derive(Debug, Clone)]
pub struct ListingState {
    identity: Identity,
    properties: Vec<Property>,
    view_history: Vec<ViewHistoryEntry>,
    favorites: Vec<FavoriteEntry>,
    favorited: FavoritedSet,
    view: View,
    cursor: PageCursor,
    page_size: usize,
    loading: bool,
    generation: u64,
    reload_key: Option<IdentityKey>,
    removal_request: Option<PropertyId>,
    last_unfavorited: Option<Unfavorited>,
}

impl Default for ListingState {
    fn default() -> Self {
        Self::new(pagination::PAGE_SIZE)
    }
}

impl ListingState {
    pub fn new(page_size: usize) -> Self {
        Self {
            identity: Identity::Anonymous,
            properties: Vec::new(),
            view_history: Vec::new(),
            favorites: Vec::new(),
            favorited: FavoritedSet::new(),
            view: View::Main,
            cursor: PageCursor::new(),
            page_size: page_size.max(1),
            loading: false,
            generation: 0,
            reload_key: None,
            removal_request: None,
            last_unfavorited: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn view_history(&self) -> &[ViewHistoryEntry] {
        &self.view_history
    }

    pub fn favorites(&self) -> &[FavoriteEntry] {
        &self.favorites
    }

    pub fn favorited(&self) -> &FavoritedSet {
        &self.favorited
    }

    pub fn is_favorited(&self, id: &PropertyId) -> bool {
        self.favorited.is_favorited(id)
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn page(&self) -> usize {
        self.cursor.page()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The entry awaiting removal confirmation, if any.
    pub fn removal_request(&self) -> Option<&PropertyId> {
        self.removal_request.as_ref()
    }

    // ------------------------------------------------------------------
    // Reload
    // ------------------------------------------------------------------

    /// Whether `identity` differs from the one the last reload was for.
    ///
    /// Token refreshes keep the same key and do not trigger a reload.
    pub fn needs_reload(&self, identity: &Identity) -> bool {
        self.reload_key.as_ref() != Some(&identity.key())
    }

    /// Starts a full reload for `identity`: discards per-identity state,
    /// marks the state loading and returns the ticket for the results.
    pub fn begin_reload(&mut self, identity: Identity) -> ReloadTicket {
        self.generation += 1;
        let key = identity.key();
        tracing::debug!(
            "[ListingState] Reload #{} for {:?}",
            self.generation,
            key
        );

        if identity.is_anonymous() && self.view.requires_identity() {
            self.view = View::Main;
        }
        self.identity = identity;
        self.reload_key = Some(key.clone());
        self.properties.clear();
        self.view_history.clear();
        self.favorites.clear();
        self.favorited.clear();
        self.removal_request = None;
        self.last_unfavorited = None;
        self.cursor.reset();
        self.loading = true;

        ReloadTicket {
            generation: self.generation,
            key,
        }
    }

    /// Applies reload results. Returns `false` (and changes nothing) when
    /// a newer reload has started since `ticket` was issued.
    ///
    /// Guests whose lists come back empty get placeholder entries.
    pub fn apply_snapshot(
        &mut self,
        ticket: &ReloadTicket,
        snapshot: Snapshot,
        now: DateTime<Utc>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                "[ListingState] Discarding stale reload #{} (current #{})",
                ticket.generation,
                self.generation
            );
            return false;
        }

        let Snapshot {
            properties,
            mut view_history,
            mut favorites,
            favorited,
        } = snapshot;

        if self.identity.is_guest() {
            if view_history.is_empty() {
                view_history = seed_view_history(&properties, now);
            }
            if favorites.is_empty() {
                favorites = seed_favorites(&properties, now);
            }
        }

        self.properties = properties;
        self.view_history = view_history;
        self.favorites = favorites;
        self.favorited = self.favorites.iter().map(|f| f.id().clone()).collect();
        self.report_flag_mismatches(&favorited);
        self.loading = false;

        tracing::debug!(
            "[ListingState] Loaded {} properties, {} viewed, {} favorites",
            self.properties.len(),
            self.view_history.len(),
            self.favorites.len()
        );
        true
    }

    /// The favorited set is rebuilt from the favorites list; remote flags
    /// that disagree with it are only reported.
    fn report_flag_mismatches(&self, remote: &HashMap<PropertyId, bool>) {
        let remote: FavoritedSet = remote.clone().into();
        let disagree = remote
            .ids()
            .filter(|id| !self.favorited.is_favorited(id))
            .count()
            + self
                .favorited
                .ids()
                .filter(|id| self.properties.iter().any(|p| &p.id == *id))
                .filter(|id| !remote.is_favorited(id))
                .count();
        if disagree > 0 && !remote.is_empty() {
            tracing::warn!(
                "[ListingState] {} favorite flag(s) disagree with the favorites list",
                disagree
            );
        }
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Moves `id` to the front of the view history with timestamp `now`,
    /// adding it if absent.
    ///
    /// # Errors
    ///
    /// [`ListingError::UnknownProperty`] when the listing is not loaded.
    pub fn view_property(&mut self, id: &PropertyId, now: DateTime<Utc>) -> Result<(), ListingError> {
        let property = match self.view_history.iter().position(|e| e.id() == id) {
            Some(index) => self.view_history.remove(index).property,
            None => self
                .find_property(id)
                .cloned()
                .ok_or_else(|| ListingError::UnknownProperty(id.clone()))?,
        };
        self.view_history.insert(0, ViewHistoryEntry::new(property, now));
        Ok(())
    }

    /// Flips the favorite flag of `id` and updates the favorites list to
    /// match. Returns the new flag.
    ///
    /// # Errors
    ///
    /// [`ListingError::SignInRequired`] for anonymous users and
    /// [`ListingError::UnknownProperty`] when the listing is not loaded.
    pub fn toggle_favorite(&mut self, id: &PropertyId, now: DateTime<Utc>) -> Result<bool, ListingError> {
        if self.identity.is_anonymous() {
            return Err(ListingError::SignInRequired);
        }

        if self.favorited.is_favorited(id) {
            if let Some(index) = self.favorites.iter().position(|f| f.id() == id) {
                let entry = self.favorites.remove(index);
                self.last_unfavorited = Some(Unfavorited { index, entry });
            }
            self.favorited.set(id.clone(), false);
            self.clamp_cursor();
            return Ok(false);
        }

        let entry = match self.last_unfavorited.take() {
            Some(stashed) if stashed.entry.id() == id => {
                let index = stashed.index.min(self.favorites.len());
                self.favorites.insert(index, stashed.entry);
                None
            }
            _ => {
                let property = self
                    .find_property(id)
                    .cloned()
                    .ok_or_else(|| ListingError::UnknownProperty(id.clone()))?;
                Some(FavoriteEntry::new(property, now))
            }
        };
        if let Some(entry) = entry {
            self.favorites.insert(0, entry);
        }
        self.favorited.set(id.clone(), true);
        Ok(true)
    }

    /// First step of removing a view-history entry.
    pub fn request_removal(&mut self, id: &PropertyId) -> Result<(), ListingError> {
        if self.identity.is_anonymous() {
            return Err(ListingError::SignInRequired);
        }
        self.removal_request = Some(id.clone());
        Ok(())
    }

    pub fn cancel_removal(&mut self) {
        self.removal_request = None;
    }

    /// Second step: takes the request so the caller can issue the remote
    /// delete, then report success through [`ListingState::apply_removal`].
    pub fn confirm_removal(&mut self) -> Result<PendingRemoval, ListingError> {
        let property_id = self
            .removal_request
            .take()
            .ok_or(ListingError::NoPendingRemoval)?;
        Ok(PendingRemoval {
            property_id,
            generation: self.generation,
        })
    }

    /// Removes the entry after the remote delete succeeded and pulls the
    /// cursor back onto the last page. Returns whether an entry was removed;
    /// an entry that is not in the list, or a removal issued before the last
    /// reload, leaves the state unchanged.
    pub fn apply_removal(&mut self, removal: &PendingRemoval) -> bool {
        if removal.generation != self.generation {
            return false;
        }
        let before = self.view_history.len();
        self.view_history.retain(|e| e.id() != &removal.property_id);
        let removed = self.view_history.len() != before;
        if removed {
            self.clamp_cursor();
        }
        removed
    }

    /// Changes the view and resets the cursor to page 1. Does not reload.
    pub fn switch_view(&mut self, view: View) -> Result<(), ListingError> {
        if view.requires_identity() && self.identity.is_anonymous() {
            return Err(ListingError::SignInRequired);
        }
        self.view = view;
        self.cursor.reset();
        Ok(())
    }

    /// Moves to `page` of the current view.
    ///
    /// # Errors
    ///
    /// [`ListingError::PageOutOfRange`] when `page` is outside
    /// `1..=total_pages` (page 1 is always accepted).
    pub fn change_page(&mut self, page: usize) -> Result<(), ListingError> {
        let total_pages = self.total_pages();
        if self.cursor.go_to(page, total_pages) {
            Ok(())
        } else {
            Err(ListingError::PageOutOfRange { page, total_pages })
        }
    }

    // ------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------

    fn current_len(&self) -> usize {
        match self.view {
            View::Main => 0,
            View::ViewHistory => self.view_history.len(),
            View::Favorites => self.favorites.len(),
        }
    }

    /// Pages in the current view; the main view is not paginated.
    pub fn total_pages(&self) -> usize {
        pagination::total_pages(self.current_len(), self.page_size)
    }

    pub fn page_info(&self) -> PageInfo {
        let total_pages = self.total_pages();
        let page = self.cursor.page();
        PageInfo {
            page,
            total_pages,
            controls: pagination::page_controls(page, total_pages),
            has_previous: self.cursor.has_previous(),
            has_next: self.cursor.has_next(total_pages),
        }
    }

    /// View-history entries on the current page.
    pub fn history_page(&self) -> &[ViewHistoryEntry] {
        pagination::page_slice(&self.view_history, self.cursor.page(), self.page_size)
    }

    /// Favorites on the current page.
    pub fn favorites_page(&self) -> &[FavoriteEntry] {
        pagination::page_slice(&self.favorites, self.cursor.page(), self.page_size)
    }

    fn clamp_cursor(&mut self) {
        self.cursor.clamp(self.total_pages());
    }

    fn find_property(&self, id: &PropertyId) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| &p.id == id)
            .or_else(|| self.view_history.iter().map(|e| &e.property).find(|p| &p.id == id))
            .or_else(|| self.favorites.iter().map(|f| &f.property).find(|p| &p.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use estate_core::identity::{AuthSession, AuthUser};

    fn user(id: &str) -> Identity {
        Identity::Authenticated(AuthSession {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: id.to_string(),
                email: None,
                avatar_url: None,
            },
        })
    }

    fn catalogue(n: i64) -> Vec<Property> {
        (1..=n).map(|i| Property::new(i, format!("Listing {i}"))).collect()
    }

    fn loaded(identity: Identity, snapshot: Snapshot) -> ListingState {
        let mut state = ListingState::default();
        let ticket = state.begin_reload(identity);
        assert!(state.apply_snapshot(&ticket, snapshot, Utc::now()));
        state
    }

    fn with_catalogue(identity: Identity, n: i64) -> ListingState {
        loaded(
            identity,
            Snapshot {
                properties: catalogue(n),
                ..Snapshot::default()
            },
        )
    }

    fn history_ids(state: &ListingState) -> Vec<String> {
        state.view_history().iter().map(|e| e.id().to_string()).collect()
    }

    fn assert_favorites_consistent(state: &ListingState) {
        assert_eq!(state.favorited().len(), state.favorites().len());
        for entry in state.favorites() {
            assert!(state.is_favorited(entry.id()));
        }
    }

    #[test]
    fn test_view_property_dedupes_and_orders_by_recency() {
        let mut state = with_catalogue(user("u1"), 5);
        let t0 = Utc::now();
        for (i, id) in [1, 2, 3, 2, 1, 4, 1].into_iter().enumerate() {
            state
                .view_property(&PropertyId::from(id), t0 + Duration::seconds(i as i64))
                .unwrap();
        }
        assert_eq!(history_ids(&state), vec!["1", "4", "2", "3"]);
        assert!(
            state
                .view_history()
                .windows(2)
                .all(|w| w[0].viewed_at > w[1].viewed_at)
        );
    }

    #[test]
    fn test_view_unknown_property_is_rejected() {
        let mut state = with_catalogue(user("u1"), 2);
        let err = state
            .view_property(&PropertyId::from(99), Utc::now())
            .unwrap_err();
        assert_eq!(err, ListingError::UnknownProperty(PropertyId::from(99)));
        assert!(state.view_history().is_empty());
    }

    #[test]
    fn test_toggle_pairs_restore_previous_state() {
        let mut state = with_catalogue(user("u1"), 6);
        let now = Utc::now();
        for id in [3, 1, 5] {
            state.toggle_favorite(&PropertyId::from(id), now).unwrap();
        }
        let before = (state.favorites().to_vec(), state.favorited().clone());

        for id in [1, 4] {
            let id = PropertyId::from(id);
            let later = now + Duration::minutes(5);
            state.toggle_favorite(&id, later).unwrap();
            assert_favorites_consistent(&state);
            state.toggle_favorite(&id, later).unwrap();
            assert_favorites_consistent(&state);
            assert_eq!((state.favorites().to_vec(), state.favorited().clone()), before);
        }
    }

    #[test]
    fn test_toggle_requires_identity() {
        let mut state = with_catalogue(Identity::Anonymous, 3);
        let err = state
            .toggle_favorite(&PropertyId::from(1), Utc::now())
            .unwrap_err();
        assert!(err.is_sign_in_required());
        assert!(state.favorited().is_empty());
    }

    #[test]
    fn test_toggle_while_loading_finds_nothing() {
        let mut state = ListingState::default();
        let _ticket = state.begin_reload(user("u1"));
        assert!(state.is_loading());
        let err = state
            .toggle_favorite(&PropertyId::from(1), Utc::now())
            .unwrap_err();
        assert_eq!(err, ListingError::UnknownProperty(PropertyId::from(1)));
    }

    #[test]
    fn test_removal_needs_confirmation() {
        let mut state = with_catalogue(user("u1"), 3);
        state.view_property(&PropertyId::from(1), Utc::now()).unwrap();

        assert_eq!(state.confirm_removal(), Err(ListingError::NoPendingRemoval));
        state.request_removal(&PropertyId::from(1)).unwrap();
        state.cancel_removal();
        assert_eq!(state.confirm_removal(), Err(ListingError::NoPendingRemoval));
        assert_eq!(state.view_history().len(), 1);

        state.request_removal(&PropertyId::from(1)).unwrap();
        let pending = state.confirm_removal().unwrap();
        assert_eq!(state.view_history().len(), 1);
        assert!(state.apply_removal(&pending));
        assert!(state.view_history().is_empty());
    }

    #[test]
    fn test_removing_missing_entry_changes_nothing() {
        let mut state = with_catalogue(user("u1"), 3);
        state.view_property(&PropertyId::from(2), Utc::now()).unwrap();
        state.request_removal(&PropertyId::from(3)).unwrap();
        let pending = state.confirm_removal().unwrap();
        assert!(!state.apply_removal(&pending));
        assert_eq!(history_ids(&state), vec!["2"]);
    }

    #[test]
    fn test_removal_clamps_cursor_to_last_page() {
        let mut state = with_catalogue(user("u1"), 9);
        let now = Utc::now();
        for id in 1..=9 {
            state
                .view_property(&PropertyId::from(id), now + Duration::seconds(id))
                .unwrap();
        }
        state.switch_view(View::ViewHistory).unwrap();
        state.change_page(3).unwrap();
        assert_eq!(state.history_page().len(), 1);

        let last = state.history_page()[0].id().clone();
        state.request_removal(&last).unwrap();
        let pending = state.confirm_removal().unwrap();
        assert!(state.apply_removal(&pending));
        assert_eq!(state.page(), 2);
        assert_eq!(state.total_pages(), 2);
    }

    #[test]
    fn test_removal_from_superseded_identity_is_ignored() {
        let mut state = with_catalogue(user("u1"), 3);
        state.view_property(&PropertyId::from(1), Utc::now()).unwrap();
        state.request_removal(&PropertyId::from(1)).unwrap();
        let pending = state.confirm_removal().unwrap();

        let ticket = state.begin_reload(user("u1"));
        let snapshot = Snapshot {
            properties: catalogue(3),
            view_history: vec![ViewHistoryEntry::new(Property::new(1, "Listing 1"), Utc::now())],
            ..Snapshot::default()
        };
        state.apply_snapshot(&ticket, snapshot, Utc::now());
        assert!(!state.apply_removal(&pending));
        assert_eq!(state.view_history().len(), 1);
    }

    #[test]
    fn test_nine_items_three_pages() {
        let mut state = with_catalogue(user("u1"), 9);
        for id in 1..=9 {
            state.toggle_favorite(&PropertyId::from(id), Utc::now()).unwrap();
        }
        state.switch_view(View::Favorites).unwrap();
        assert_eq!(state.total_pages(), 3);
        assert_eq!(
            state.page_info().controls,
            vec![PageControl::Page(1), PageControl::Page(2), PageControl::Page(3)]
        );

        state.change_page(3).unwrap();
        assert_eq!(state.favorites_page().len(), 1);
        assert!(!state.page_info().has_next);

        assert_eq!(
            state.change_page(4),
            Err(ListingError::PageOutOfRange {
                page: 4,
                total_pages: 3
            })
        );
        assert_eq!(state.page(), 3);
    }

    #[test]
    fn test_switching_views_resets_cursor() {
        let mut state = with_catalogue(Identity::Guest, 18);
        state.switch_view(View::Favorites).unwrap();
        state.change_page(3).unwrap();
        assert_eq!(state.page(), 3);

        let favorites_before = state.favorites().len();
        state.switch_view(View::Main).unwrap();
        state.switch_view(View::Favorites).unwrap();
        assert_eq!(state.page(), 1);
        assert_eq!(state.favorites().len(), favorites_before);
    }

    #[test]
    fn test_main_view_only_accepts_page_one() {
        let mut state = with_catalogue(user("u1"), 9);
        assert!(state.change_page(1).is_ok());
        assert!(state.change_page(2).is_err());
        assert!(state.page_info().controls.is_empty());
    }

    #[test]
    fn test_anonymous_cannot_open_gated_views() {
        let mut state = with_catalogue(Identity::Anonymous, 3);
        assert_eq!(
            state.switch_view(View::Favorites),
            Err(ListingError::SignInRequired)
        );
        assert_eq!(state.view(), View::Main);
    }

    #[test]
    fn test_guest_is_seeded_and_consistent() {
        let state = with_catalogue(Identity::Guest, 18);
        assert_eq!(state.view_history().len(), 15);
        assert_eq!(state.favorites().len(), 13);
        assert_favorites_consistent(&state);
    }

    #[test]
    fn test_stale_snapshot_is_discarded() {
        let mut state = ListingState::default();
        let first = state.begin_reload(user("u1"));
        let second = state.begin_reload(user("u2"));

        let stale = Snapshot {
            properties: catalogue(2),
            favorites: vec![FavoriteEntry::new(Property::new(1, "Listing 1"), Utc::now())],
            ..Snapshot::default()
        };
        assert!(!state.apply_snapshot(&first, stale, Utc::now()));
        assert!(state.is_loading());
        assert!(state.favorites().is_empty());

        assert!(state.apply_snapshot(&second, Snapshot::default(), Utc::now()));
        assert!(!state.is_loading());
        assert_eq!(second.key(), &IdentityKey::User("u2".to_string()));
    }

    #[test]
    fn test_needs_reload_ignores_token_refresh() {
        let mut state = ListingState::default();
        assert!(state.needs_reload(&Identity::Anonymous));
        state.begin_reload(user("u1"));

        let Identity::Authenticated(mut refreshed) = user("u1") else {
            unreachable!()
        };
        refreshed.access_token = "refreshed".to_string();
        assert!(!state.needs_reload(&Identity::Authenticated(refreshed)));
        assert!(state.needs_reload(&Identity::Guest));
    }

    #[test]
    fn test_sign_out_leaves_gated_view() {
        let mut state = with_catalogue(Identity::Guest, 5);
        state.switch_view(View::ViewHistory).unwrap();
        state.begin_reload(Identity::Anonymous);
        assert_eq!(state.view(), View::Main);
    }

    #[test]
    fn test_loaded_favorites_define_the_favorited_set() {
        let now = Utc::now();
        let state = loaded(
            user("u1"),
            Snapshot {
                properties: catalogue(4),
                favorites: vec![FavoriteEntry::new(Property::new(2, "Listing 2"), now)],
                favorited: HashMap::from([(PropertyId::from(2), true)]),
                ..Snapshot::default()
            },
        );
        assert!(state.is_favorited(&PropertyId::from(2)));
        assert!(!state.is_favorited(&PropertyId::from(1)));
        assert_favorites_consistent(&state);
    }
}
