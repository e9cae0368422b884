use anyhow::Result;
use estate_application::BrowseSession;

use crate::render;

/// Prints the full catalogue for the current identity.
pub async fn list(session: &BrowseSession) -> Result<()> {
    let state = session.state().await;
    render::print_profile(state.identity());

    if state.properties().is_empty() {
        render::print_empty("No properties found.");
        return Ok(());
    }
    for property in state.properties() {
        render::print_card(property, state.is_favorited(&property.id), None);
    }
    println!("{} properties", state.properties().len());
    Ok(())
}
