//! Storage tiers and their collaborator contracts.

pub mod http;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use http::HttpStore;
pub use memory::MemoryCache;
pub use sqlite::SqliteStore;
pub use traits::{LocalStore, RemoteStore, StoreError};
