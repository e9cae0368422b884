//! Session/identity provider.
//!
//! - `state`: `SessionState`, `SessionEvent` and the pure `transition` function
//! - `provider`: `SessionProvider`, which drives transitions from auth calls
//!   and auth-service notifications

mod provider;
mod state;

pub use provider::SessionProvider;
pub use state::{SessionEvent, SessionState, transition};
