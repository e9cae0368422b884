//! View history / favorites reconciliation.
//!
//! - `state`: `ListingState`, the in-memory lists and their update rules
//! - `guest_seed`: placeholder entries for guest mode
//! - `error`: `ListingError`

mod error;
mod guest_seed;
mod state;

pub use error::ListingError;
pub use guest_seed::{seed_favorites, seed_view_history};
pub use state::{ListingState, PageInfo, PendingRemoval, ReloadTicket, Snapshot, View};
