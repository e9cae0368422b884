use estate_core::error::EstateError;
use estate_core::property::PropertyId;
use thiserror::Error;

/// Rejections of listing actions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ListingError {
    /// The action needs a guest or signed-in user; the shell shows sign-in.
    #[error("Sign in to use this feature")]
    SignInRequired,

    #[error("Property '{0}' is not loaded")]
    UnknownProperty(PropertyId),

    /// Page change outside `1..=total_pages`; the cursor did not move.
    #[error("Page {page} is out of range (total pages: {total_pages})")]
    PageOutOfRange { page: usize, total_pages: usize },

    #[error("No removal is awaiting confirmation")]
    NoPendingRemoval,

    /// The remote write failed; local state was left as it was.
    #[error(transparent)]
    Remote(#[from] EstateError),
}

impl ListingError {
    pub fn is_sign_in_required(&self) -> bool {
        matches!(self, Self::SignInRequired)
    }
}
