//! Read projections of incidents.
//!
//! Incidents store ids only; projections resolve them to display strings:
//! the disease name, `"first last"` for the patient, `"city, country"` for
//! the location, and symptom names in the incident's stored order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use incidents_core::{DiseaseId, IncidentId, LocationId, PatientId, Record, Stored, SymptomId};
use incidents_domain::{Disease, Incident, Location, Patient, Symptom};

use crate::store::{EntityStore, Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentView {
    pub id: IncidentId,
    pub disease_name: String,
    pub patient_name: Option<String>,
    pub location: Option<String>,
    pub date_reported: DateTime<Utc>,
    pub symptoms: Vec<String>,
}

/// Lightweight list row (no symptoms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListing {
    pub id: IncidentId,
    pub disease_name: String,
    pub patient_name: Option<String>,
    pub location: Option<String>,
    pub date_reported: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentDetails {
    pub id: IncidentId,
    pub disease_name: String,
    pub disease_description: String,
    pub patient_name: Option<String>,
    pub patient_date_of_birth: Option<NaiveDate>,
    pub patient_contact: Option<String>,
    pub location: Option<String>,
    pub date_reported: DateTime<Utc>,
    pub symptoms: Vec<String>,
}

/// Incident count per disease and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub disease_name: String,
    pub location: Option<String>,
    pub total_cases: usize,
    pub last_reported: DateTime<Utc>,
}

/// The referenced rows needed to project a set of incidents.
#[derive(Debug, Default)]
pub(crate) struct Catalog {
    diseases: HashMap<DiseaseId, Disease>,
    patients: HashMap<PatientId, Patient>,
    locations: HashMap<LocationId, Location>,
    symptoms: HashMap<SymptomId, Symptom>,
}

impl Catalog {
    /// Everything, for projecting many incidents at once.
    pub(crate) async fn load_all<S: Store + ?Sized>(store: &S) -> Result<Self, StoreError> {
        Ok(Self {
            diseases: index(EntityStore::<Disease>::list_all(store).await?),
            patients: index(EntityStore::<Patient>::list_all(store).await?),
            locations: index(EntityStore::<Location>::list_all(store).await?),
            symptoms: index(EntityStore::<Symptom>::list_all(store).await?),
        })
    }

    /// Only the rows one incident references.
    pub(crate) async fn for_incident<S: Store + ?Sized>(
        store: &S,
        incident: &Incident,
    ) -> Result<Self, StoreError> {
        let mut catalog = Self::default();
        if let Some(row) = EntityStore::<Disease>::find(store, incident.disease_id).await? {
            catalog.diseases.insert(row.id, row.record);
        }
        if let Some(id) = incident.patient_id {
            if let Some(row) = EntityStore::<Patient>::find(store, id).await? {
                catalog.patients.insert(row.id, row.record);
            }
        }
        if let Some(id) = incident.location_id {
            if let Some(row) = EntityStore::<Location>::find(store, id).await? {
                catalog.locations.insert(row.id, row.record);
            }
        }
        catalog.symptoms = index(EntityStore::<Symptom>::find_many(store, &incident.symptom_ids).await?);
        Ok(catalog)
    }

    fn disease(&self, row: &Stored<Incident>) -> Result<&Disease, StoreError> {
        self.diseases.get(&row.record.disease_id).ok_or_else(|| {
            StoreError::Integrity(format!(
                "incident {} references missing disease {}",
                row.id, row.record.disease_id
            ))
        })
    }

    fn patient(&self, incident: &Incident) -> Option<&Patient> {
        incident.patient_id.and_then(|id| self.patients.get(&id))
    }

    fn location(&self, incident: &Incident) -> Option<String> {
        incident
            .location_id
            .and_then(|id| self.locations.get(&id))
            .map(Location::label)
    }

    /// Names in the incident's symptom order. A symptom deleted after the
    /// incident was read is skipped.
    fn symptom_names(&self, incident: &Incident) -> Vec<String> {
        incident
            .symptom_ids
            .iter()
            .filter_map(|id| self.symptoms.get(id))
            .map(|s| s.name.clone())
            .collect()
    }

    pub(crate) fn view(&self, row: &Stored<Incident>) -> Result<IncidentView, StoreError> {
        Ok(IncidentView {
            id: row.id,
            disease_name: self.disease(row)?.name.clone(),
            patient_name: self.patient(&row.record).map(Patient::full_name),
            location: self.location(&row.record),
            date_reported: row.record.date_reported,
            symptoms: self.symptom_names(&row.record),
        })
    }

    pub(crate) fn listing(&self, row: &Stored<Incident>) -> Result<IncidentListing, StoreError> {
        Ok(IncidentListing {
            id: row.id,
            disease_name: self.disease(row)?.name.clone(),
            patient_name: self.patient(&row.record).map(Patient::full_name),
            location: self.location(&row.record),
            date_reported: row.record.date_reported,
        })
    }

    pub(crate) fn details(&self, row: &Stored<Incident>) -> Result<IncidentDetails, StoreError> {
        let disease = self.disease(row)?;
        let patient = self.patient(&row.record);
        Ok(IncidentDetails {
            id: row.id,
            disease_name: disease.name.clone(),
            disease_description: disease.description.clone(),
            patient_name: patient.map(Patient::full_name),
            patient_date_of_birth: patient.map(|p| p.date_of_birth),
            patient_contact: patient.map(|p| p.contact_info.clone()),
            location: self.location(&row.record),
            date_reported: row.record.date_reported,
            symptoms: self.symptom_names(&row.record),
        })
    }

    /// Group by (disease name, location), ordered by disease name then location.
    pub(crate) fn summarize(&self, rows: &[Stored<Incident>]) -> Result<Vec<CaseSummary>, StoreError> {
        let mut groups: BTreeMap<(String, Option<String>), CaseSummary> = BTreeMap::new();
        for row in rows {
            let disease_name = self.disease(row)?.name.clone();
            let location = self.location(&row.record);
            groups
                .entry((disease_name.clone(), location.clone()))
                .and_modify(|s| {
                    s.total_cases += 1;
                    s.last_reported = s.last_reported.max(row.record.date_reported);
                })
                .or_insert(CaseSummary {
                    disease_name,
                    location,
                    total_cases: 1,
                    last_reported: row.record.date_reported,
                });
        }
        Ok(groups.into_values().collect())
    }
}

fn index<E: Record>(rows: Vec<Stored<E>>) -> HashMap<E::Id, E> {
    rows.into_iter().map(|row| (row.id, row.record)).collect()
}
