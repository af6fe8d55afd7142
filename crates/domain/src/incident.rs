//! Incident: the aggregate root.
//!
//! An incident references one disease (required), optionally a patient and a
//! location, and an ordered set of symptoms. Symptom order is the order the
//! caller supplied; duplicates are dropped keeping the first occurrence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use incidents_core::{
    DiseaseId, DomainError, DomainResult, EntityKind, IncidentId, LocationId, Patch, PatientId,
    Record, SymptomId,
};

use crate::merge::Merge;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub disease_id: DiseaseId,
    pub patient_id: Option<PatientId>,
    pub location_id: Option<LocationId>,
    pub date_reported: DateTime<Utc>,
    pub symptom_ids: Vec<SymptomId>,
}

impl Incident {
    /// Materialize a new incident, filling defaults from `now`.
    pub fn from_new(new: NewIncident, now: DateTime<Utc>) -> Self {
        Self {
            disease_id: new.disease_id,
            patient_id: new.patient_id,
            location_id: new.location_id,
            date_reported: new.date_reported.unwrap_or(now),
            symptom_ids: normalize_symptoms(new.symptom_ids.unwrap_or_default()),
        }
    }
}

impl Record for Incident {
    type Id = IncidentId;

    const KIND: EntityKind = EntityKind::Incident;

    fn validate(&self) -> DomainResult<()> {
        if self.disease_id.is_unset() {
            return Err(DomainError::invalid_id("diseaseId must be a positive id"));
        }
        Ok(())
    }
}

/// Create payload. Omitted optional fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewIncident {
    pub disease_id: DiseaseId,
    pub patient_id: Option<PatientId>,
    pub location_id: Option<LocationId>,
    pub date_reported: Option<DateTime<Utc>>,
    pub symptom_ids: Option<Vec<SymptomId>>,
}

/// Sparse update. `symptom_ids`, when set, replaces the whole symptom set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncidentPatch {
    pub disease_id: Patch<DiseaseId>,
    pub patient_id: Patch<PatientId>,
    pub location_id: Patch<LocationId>,
    pub date_reported: Patch<DateTime<Utc>>,
    pub symptom_ids: Patch<Vec<SymptomId>>,
}

impl IncidentPatch {
    pub fn is_empty(&self) -> bool {
        self.disease_id.is_absent()
            && self.patient_id.is_absent()
            && self.location_id.is_absent()
            && self.date_reported.is_absent()
            && self.symptom_ids.is_absent()
    }
}

impl Merge for Incident {
    type Patch = IncidentPatch;

    fn merge(&self, patch: &IncidentPatch) -> Self {
        Self {
            disease_id: patch.disease_id.apply(&self.disease_id),
            patient_id: patch.patient_id.as_set().copied().or(self.patient_id),
            location_id: patch.location_id.as_set().copied().or(self.location_id),
            date_reported: patch.date_reported.apply(&self.date_reported),
            symptom_ids: match &patch.symptom_ids {
                Patch::Set(ids) => normalize_symptoms(ids.clone()),
                Patch::Absent => self.symptom_ids.clone(),
            },
        }
    }
}

/// Drop repeated ids, keeping the first occurrence and the caller's order.
pub fn normalize_symptoms(ids: Vec<SymptomId>) -> Vec<SymptomId> {
    let mut out: Vec<SymptomId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn test_incident() -> Incident {
        Incident {
            disease_id: DiseaseId::new(1),
            patient_id: Some(PatientId::new(2)),
            location_id: Some(LocationId::new(3)),
            date_reported: test_time(),
            symptom_ids: vec![SymptomId::new(1), SymptomId::new(3)],
        }
    }

    #[test]
    fn from_new_applies_defaults() {
        let now = test_time();
        let incident = Incident::from_new(
            NewIncident {
                disease_id: DiseaseId::new(1),
                ..Default::default()
            },
            now,
        );
        assert_eq!(incident.date_reported, now);
        assert!(incident.symptom_ids.is_empty());
        assert_eq!(incident.patient_id, None);
    }

    #[test]
    fn from_new_keeps_caller_symptom_order() {
        let incident = Incident::from_new(
            NewIncident {
                disease_id: DiseaseId::new(1),
                symptom_ids: Some(vec![SymptomId::new(4), SymptomId::new(1), SymptomId::new(4)]),
                ..Default::default()
            },
            test_time(),
        );
        assert_eq!(incident.symptom_ids, vec![SymptomId::new(4), SymptomId::new(1)]);
    }

    #[test]
    fn date_only_patch_preserves_references() {
        let later = test_time() + chrono::Duration::days(2);
        let patch = IncidentPatch {
            date_reported: Patch::Set(later),
            ..Default::default()
        };
        let merged = test_incident().merge(&patch);
        assert_eq!(merged.date_reported, later);
        assert_eq!(merged.disease_id, DiseaseId::new(1));
        assert_eq!(merged.patient_id, Some(PatientId::new(2)));
        assert_eq!(merged.location_id, Some(LocationId::new(3)));
        assert_eq!(merged.symptom_ids, vec![SymptomId::new(1), SymptomId::new(3)]);
    }

    #[test]
    fn symptom_patch_replaces_the_whole_set() {
        let patch = IncidentPatch {
            symptom_ids: Patch::Set(vec![SymptomId::new(2)]),
            ..Default::default()
        };
        assert_eq!(test_incident().merge(&patch).symptom_ids, vec![SymptomId::new(2)]);

        let clear = IncidentPatch {
            symptom_ids: Patch::Set(vec![]),
            ..Default::default()
        };
        assert!(test_incident().merge(&clear).symptom_ids.is_empty());
    }

    #[test]
    fn null_fields_in_json_are_absent() {
        let patch: IncidentPatch =
            serde_json::from_str(r#"{"patientId": null, "symptomIds": [2, 1]}"#).unwrap();
        assert!(patch.patient_id.is_absent());
        assert_eq!(
            patch.symptom_ids,
            Patch::Set(vec![SymptomId::new(2), SymptomId::new(1)])
        );
        assert!(!patch.is_empty());
        assert!(IncidentPatch::default().is_empty());
    }

    #[test]
    fn missing_disease_id_deserializes_as_unset() {
        let new: NewIncident = serde_json::from_str(r#"{"symptomIds": [1]}"#).unwrap();
        assert!(new.disease_id.is_unset());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        use crate::disease::{Disease, DiseasePatch};

        fn arb_incident() -> impl Strategy<Value = Incident> {
            (
                1i64..1000,
                proptest::option::of(1i64..1000),
                proptest::option::of(1i64..1000),
                0i64..2_000_000_000,
                proptest::collection::vec(1i64..50, 0..8),
            )
                .prop_map(|(d, p, l, secs, symptoms)| Incident {
                    disease_id: DiseaseId::new(d),
                    patient_id: p.map(PatientId::new),
                    location_id: l.map(LocationId::new),
                    date_reported: Utc.timestamp_opt(secs, 0).unwrap(),
                    symptom_ids: normalize_symptoms(
                        symptoms.into_iter().map(SymptomId::new).collect(),
                    ),
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: an empty patch leaves the incident unchanged.
            #[test]
            fn empty_patch_is_identity(incident in arb_incident()) {
                prop_assert_eq!(incident.merge(&IncidentPatch::default()), incident);
            }

            /// Property: blank strings never overwrite text fields.
            #[test]
            fn blank_text_never_overwrites(
                name in "[A-Za-z][A-Za-z0-9 -]{0,30}",
                blank in "[ \t]{0,4}",
            ) {
                let current = Disease::new(name.clone(), "description");
                let patch = DiseasePatch {
                    name: Patch::Set(blank.clone()),
                    description: Patch::Set(blank),
                };
                prop_assert_eq!(current.merge(&patch), current);
            }

            /// Property: merged symptom ids never contain duplicates.
            #[test]
            fn merged_symptoms_are_distinct(
                incident in arb_incident(),
                ids in proptest::collection::vec(1i64..10, 0..12),
            ) {
                let patch = IncidentPatch {
                    symptom_ids: Patch::Set(ids.into_iter().map(SymptomId::new).collect()),
                    ..Default::default()
                };
                let merged = incident.merge(&patch);
                let mut sorted = merged.symptom_ids.clone();
                sorted.sort();
                sorted.dedup();
                prop_assert_eq!(sorted.len(), merged.symptom_ids.len());
            }
        }
    }
}
