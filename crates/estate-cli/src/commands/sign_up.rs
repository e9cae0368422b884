use anyhow::Result;
use colored::Colorize;
use estate_core::auth::SignUpOutcome;

use crate::backend::Backend;

pub async fn run(backend: &Backend, page_size: usize, email: &str, password: &str) -> Result<()> {
    let session = super::open_session(backend, page_size).await;
    let message = match session.provider().sign_up(email, password).await? {
        SignUpOutcome::ConfirmationRequired => "Check your email to confirm your account.",
        SignUpOutcome::SignedIn(_) => "Account created! You can now sign in.",
    };
    println!("{}", message.green());
    Ok(())
}
