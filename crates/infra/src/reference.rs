//! Reference validation for incident writes.
//!
//! Confirms that every foreign key a write carries resolves to a stored row.
//! Absent references are skipped; this is what lets a partial update leave a
//! reference untouched. Read-only.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use incidents_core::{
    DiseaseId, LocationId, PatientId, Record, SymptomId, join_ids,
};
use incidents_domain::{Disease, IncidentPatch, Location, NewIncident, Patient, Symptom};

use crate::store::{EntityStore, Store, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("disease {0} does not exist")]
    UnknownDisease(DiseaseId),

    #[error("patient {0} does not exist")]
    UnknownPatient(PatientId),

    #[error("location {0} does not exist")]
    UnknownLocation(LocationId),

    /// Every unresolved id, in the order supplied.
    #[error("symptoms do not exist: {}", join_ids(.0))]
    UnknownSymptoms(Vec<SymptomId>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Candidate foreign keys of one write. `None` means "not part of this write".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub disease_id: Option<DiseaseId>,
    pub patient_id: Option<PatientId>,
    pub location_id: Option<LocationId>,
    pub symptom_ids: Option<Vec<SymptomId>>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.disease_id.is_none()
            && self.patient_id.is_none()
            && self.location_id.is_none()
            && self.symptom_ids.is_none()
    }
}

impl From<&NewIncident> for References {
    fn from(new: &NewIncident) -> Self {
        Self {
            disease_id: Some(new.disease_id),
            patient_id: new.patient_id,
            location_id: new.location_id,
            symptom_ids: new.symptom_ids.clone(),
        }
    }
}

impl From<&IncidentPatch> for References {
    fn from(patch: &IncidentPatch) -> Self {
        Self {
            disease_id: patch.disease_id.as_set().copied(),
            patient_id: patch.patient_id.as_set().copied(),
            location_id: patch.location_id.as_set().copied(),
            symptom_ids: patch.symptom_ids.as_set().cloned(),
        }
    }
}

/// Check that every present reference resolves.
///
/// Checks run disease, patient, location, then symptoms; the first failing
/// category is reported. Unknown symptoms are reported together.
pub async fn validate_references<S: Store + ?Sized>(
    store: &S,
    refs: &References,
) -> Result<(), ReferenceError> {
    if refs.is_empty() {
        return Ok(());
    }
    if let Some(id) = refs.disease_id {
        if !exists::<Disease, _>(store, id).await? {
            debug!(disease_id = %id, "unknown disease reference");
            return Err(ReferenceError::UnknownDisease(id));
        }
    }
    if let Some(id) = refs.patient_id {
        if !exists::<Patient, _>(store, id).await? {
            debug!(patient_id = %id, "unknown patient reference");
            return Err(ReferenceError::UnknownPatient(id));
        }
    }
    if let Some(id) = refs.location_id {
        if !exists::<Location, _>(store, id).await? {
            debug!(location_id = %id, "unknown location reference");
            return Err(ReferenceError::UnknownLocation(id));
        }
    }
    if let Some(ids) = &refs.symptom_ids {
        let missing = missing_symptoms(store, ids).await?;
        if !missing.is_empty() {
            debug!(missing = %join_ids(&missing), "unknown symptom references");
            return Err(ReferenceError::UnknownSymptoms(missing));
        }
    }
    Ok(())
}

async fn exists<E, S>(store: &S, id: E::Id) -> Result<bool, StoreError>
where
    E: Record,
    S: EntityStore<E> + ?Sized,
{
    Ok(store.find(id).await?.is_some())
}

async fn missing_symptoms<S>(store: &S, ids: &[SymptomId]) -> Result<Vec<SymptomId>, StoreError>
where
    S: EntityStore<Symptom> + ?Sized,
{
    let found: HashSet<SymptomId> = store
        .find_many(ids)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();

    let mut missing: Vec<SymptomId> = Vec::new();
    for id in ids {
        if !found.contains(id) && !missing.contains(id) {
            missing.push(*id);
        }
    }
    Ok(missing)
}
