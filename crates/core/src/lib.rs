//! `incidents-core` — record foundation building blocks.
//!
//! This crate contains **pure** primitives (no storage or transport concerns):
//! typed ids, the record traits, version expectations and sparse patches.

pub mod entity;
pub mod error;
pub mod id;
pub mod patch;
pub mod version;

pub use entity::{EntityKind, NaturalKey, Record, RecordId, Stored};
pub use error::{DomainError, DomainResult};
pub use id::{DiseaseId, IncidentId, LocationId, PatientId, SymptomId, join_ids};
pub use patch::Patch;
pub use version::ExpectedVersion;
