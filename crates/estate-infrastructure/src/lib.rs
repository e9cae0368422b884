pub mod catalog;
pub mod config;
pub mod dto;
pub mod gotrue_auth;
pub mod memory_auth;
pub mod memory_store;
pub mod paths;
pub mod postgrest_store;
pub mod store_gateway;

pub use crate::config::AppConfig;
pub use crate::gotrue_auth::GoTrueAuth;
pub use crate::memory_auth::MemoryAuth;
pub use crate::memory_store::MemoryStore;
pub use crate::paths::EstatePaths;
pub use crate::postgrest_store::{AccessToken, PostgrestStore};
pub use crate::store_gateway::StoreGateway;
