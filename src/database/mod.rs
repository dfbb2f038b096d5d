pub mod document;
pub mod error;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use document::{Document, DocumentState};
pub use error::{StoreError, StoreResult};
pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{check_relations, count_all, find_records, ContentStore, SharedStore};
