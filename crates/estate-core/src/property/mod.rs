//! Property domain module.
//!
//! - `model`: listings (`Property`, `PropertyId`) and card presentation helpers
//! - `history`: per-user lists (`ViewHistoryEntry`, `FavoriteEntry`) and `FavoritedSet`

mod history;
mod model;

pub use history::{FavoriteEntry, FavoritedSet, ViewHistoryEntry};
pub use model::{DEFAULT_CATALOG_IMAGE, PLACEHOLDER_IMAGE, Property, PropertyId};
