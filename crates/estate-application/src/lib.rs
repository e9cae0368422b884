//! Use cases for Estate: the session/identity provider, the listing
//! reconciliation state machine and the browse session that ties them to
//! the data gateway.

pub mod browse;
pub mod identity;
pub mod listing;

pub use browse::{BrowseSession, RemoteSync};
pub use identity::{SessionProvider, SessionState};
pub use listing::{ListingError, ListingState, View};
