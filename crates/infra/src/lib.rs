//! Infrastructure layer: entity stores and the consistency engine.
//!
//! - `store`: persistence boundary plus in-memory and SQLite backends
//! - `reference`, `uniqueness`: read-only pre-write checks
//! - `commit`: version-checked commits and conflict resolution
//! - `services`: per-kind orchestration and incident projections

pub mod commit;
pub mod reference;
pub mod services;
pub mod store;
pub mod uniqueness;
