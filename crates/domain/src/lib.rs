//! `incidents-domain` — the five record kinds and their update rules.
//!
//! Pure values only: validation, natural keys and sparse-patch merging.
//! Nothing here touches storage.

pub mod disease;
pub mod incident;
pub mod location;
pub mod merge;
pub mod patient;
pub mod symptom;

pub use disease::{Disease, DiseasePatch};
pub use incident::{Incident, IncidentPatch, NewIncident, normalize_symptoms};
pub use location::{Location, LocationKey, LocationPatch};
pub use merge::Merge;
pub use patient::{Patient, PatientPatch};
pub use symptom::{Symptom, SymptomPatch};
