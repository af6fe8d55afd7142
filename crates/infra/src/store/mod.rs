//! Entity store boundary.
//!
//! The only persistence interface the engine consumes: lookups, natural-key
//! checks, inserts, version-checked updates and deletes. The backends own the
//! unique and foreign-key constraints and apply the delete cascade policy:
//!
//! - deleting a disease deletes its incidents
//! - deleting a patient or location clears the reference on its incidents
//! - deleting a symptom removes it from every incident's symptom set
//!
//! An incident rewritten by a cascade gets a new version, like any other
//! update, so a commit based on the pre-cascade row fails the version check.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use r#trait::{EntityStore, Store, StoreError, UniqueIndex};
