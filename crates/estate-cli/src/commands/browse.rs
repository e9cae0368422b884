//! History and favorites views for guest and signed-in users.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use estate_application::{BrowseSession, View};
use estate_core::property::PropertyId;

use crate::render;

/// Paginated view selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListView {
    History,
    Favorites,
}

impl From<ListView> for View {
    fn from(view: ListView) -> Self {
        match view {
            ListView::History => View::ViewHistory,
            ListView::Favorites => View::Favorites,
        }
    }
}

/// Enters guest mode and shows the seeded list.
pub async fn guest(session: &BrowseSession, view: ListView, page: usize) -> Result<()> {
    session.provider().enable_guest_mode();
    session.sync_identity().await;
    show(session, view.into(), page).await
}

/// Signs in, optionally records a view or removes an entry, and shows the
/// view history.
pub async fn history(
    session: &BrowseSession,
    email: &str,
    password: &str,
    view: Option<String>,
    remove: Option<String>,
    page: usize,
) -> Result<()> {
    sign_in(session, email, password).await?;

    if let Some(id) = view {
        let id = PropertyId::new(id);
        if let Some(sync) = session.view_property(&id).await? {
            sync.settled().await;
        }
        println!("{}", format!("Viewed property {}", id).green());
    }
    if let Some(id) = remove {
        let id = PropertyId::new(id);
        session.request_removal(&id).await?;
        if session.confirm_removal().await? {
            println!("{}", format!("Removed property {} from history", id).green());
        }
    }

    show(session, View::ViewHistory, page).await
}

/// Signs in, optionally toggles a favorite, and shows the favorites.
pub async fn favorites(
    session: &BrowseSession,
    email: &str,
    password: &str,
    toggle: Option<String>,
    page: usize,
) -> Result<()> {
    sign_in(session, email, password).await?;

    if let Some(id) = toggle {
        let id = PropertyId::new(id);
        let (favorited, sync) = session.toggle_favorite(&id).await?;
        sync.settled().await;
        let message = if favorited {
            format!("Added property {} to favorites", id)
        } else {
            format!("Removed property {} from favorites", id)
        };
        println!("{}", message.green());
    }

    show(session, View::Favorites, page).await
}

async fn sign_in(session: &BrowseSession, email: &str, password: &str) -> Result<()> {
    session.provider().sign_in(email, password).await?;
    session.sync_identity().await;
    Ok(())
}

async fn show(session: &BrowseSession, view: View, page: usize) -> Result<()> {
    session.switch_view(view).await?;
    if page != 1 {
        session.change_page(page).await?;
    }

    let state = session.state().await;
    render::print_profile(state.identity());
    match view {
        View::ViewHistory => {
            println!("{}", "Recently Viewed".bold());
            if state.view_history().is_empty() {
                render::print_empty("No recently viewed properties.");
            }
            for entry in state.history_page() {
                render::print_card(
                    &entry.property,
                    state.is_favorited(entry.id()),
                    Some(("Viewed", entry.viewed_at)),
                );
            }
        }
        View::Favorites => {
            println!("{}", "Favorites".bold());
            if state.favorites().is_empty() {
                render::print_empty("No favorite properties yet.");
            }
            for entry in state.favorites_page() {
                render::print_card(&entry.property, true, Some(("Saved", entry.favorited_at)));
            }
        }
        View::Main => {}
    }
    render::print_page_controls(&state.page_info());
    Ok(())
}
