pub mod browse;
pub mod properties;
pub mod sign_up;

use anyhow::{Result, bail};
use estate_application::{BrowseSession, SessionProvider};
use std::sync::Arc;

use crate::backend::{Backend, DEMO_EMAIL, DEMO_PASSWORD};

/// Builds a browse session and resolves the stored session, if any.
pub async fn open_session(backend: &Backend, page_size: usize) -> Arc<BrowseSession> {
    let provider = Arc::new(SessionProvider::new(
        Arc::clone(&backend.auth),
        backend.redirect_url.clone(),
    ));
    provider.initialize().await;
    let session = Arc::new(BrowseSession::new(
        Arc::clone(&backend.gateway),
        provider,
        page_size,
    ));
    session.sync_identity().await;
    session
}

/// Email and password from the command line; the offline demo account
/// fills in whatever is missing.
pub fn credentials(
    backend: &Backend,
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String)> {
    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        (email, password) if backend.offline => Ok((
            email.unwrap_or_else(|| DEMO_EMAIL.to_string()),
            password.unwrap_or_else(|| DEMO_PASSWORD.to_string()),
        )),
        _ => bail!("--email and --password are required when connected to the hosted backend"),
    }
}
