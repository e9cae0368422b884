//! Domain layer for Estate.
//!
//! Listings, per-user view history and favorites, identities, pagination
//! arithmetic, and the interfaces of the hosted backend (auth + table store)
//! and of the data gateway built on top of it.

pub mod auth;
pub mod currency;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod pagination;
pub mod property;
pub mod store;

// Re-export common error type
pub use error::{EstateError, Result};
