//! Store-level operations behind the `cms` maintenance commands.
//!
//! Each operation is a linear sequence of store calls that stops at the
//! first failure; the caller owns the store and closes it.

pub mod error;
pub mod inventory;
pub mod keys;
pub mod repair;
pub mod tokens;

pub use error::{MaintenanceError, MaintenanceResult};
pub use inventory::{count_documents, list_applications, list_pages, ApplicationSummary, CollectionCount, PageSummary};
pub use keys::{dedup_api_keys, KeyChange, KeyIssue};
pub use repair::{parse_mapping, repair_relations, RelationMapping, RepairReport};
pub use tokens::{create_token, IssuedToken};
