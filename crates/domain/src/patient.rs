use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use incidents_core::{DomainResult, EntityKind, NaturalKey, Patch, PatientId, Record};

use crate::merge::{Merge, merge_text, require_text};

/// A patient; `national_id` is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub contact_info: String,
}

impl Patient {
    /// Display name used by incident projections.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Patient {
    type Id = PatientId;

    const KIND: EntityKind = EntityKind::Patient;

    fn validate(&self) -> DomainResult<()> {
        require_text("nationalId", &self.national_id)?;
        require_text("firstName", &self.first_name)?;
        require_text("lastName", &self.last_name)?;
        require_text("gender", &self.gender)?;
        require_text("contactInfo", &self.contact_info)
    }
}

impl NaturalKey for Patient {
    type Key = String;

    fn natural_key(&self) -> String {
        self.national_id.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatientPatch {
    pub national_id: Patch<String>,
    pub first_name: Patch<String>,
    pub last_name: Patch<String>,
    pub date_of_birth: Patch<NaiveDate>,
    pub gender: Patch<String>,
    pub contact_info: Patch<String>,
}

impl Merge for Patient {
    type Patch = PatientPatch;

    fn merge(&self, patch: &PatientPatch) -> Self {
        Self {
            national_id: merge_text(&self.national_id, &patch.national_id),
            first_name: merge_text(&self.first_name, &patch.first_name),
            last_name: merge_text(&self.last_name, &patch.last_name),
            date_of_birth: patch.date_of_birth.apply(&self.date_of_birth),
            gender: merge_text(&self.gender, &patch.gender),
            contact_info: merge_text(&self.contact_info, &patch.contact_info),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_patient() -> Patient {
        Patient {
            national_id: "NIN-001".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            gender: "F".into(),
            contact_info: "ada@example.com".into(),
        }
    }

    #[test]
    fn date_of_birth_overwrites_when_present() {
        let dob = NaiveDate::from_ymd_opt(1985, 6, 30).unwrap();
        let patch = PatientPatch {
            date_of_birth: Patch::Set(dob),
            ..Default::default()
        };
        let merged = test_patient().merge(&patch);
        assert_eq!(merged.date_of_birth, dob);
        assert_eq!(merged.national_id, "NIN-001");
        assert_eq!(merged.full_name(), "Ada Lovelace");
    }

    #[test]
    fn validate_names_the_missing_field() {
        let mut p = test_patient();
        p.contact_info = String::new();
        assert_eq!(
            p.validate().unwrap_err().to_string(),
            "validation failed: contactInfo is required"
        );
    }

    #[test]
    fn deserializes_camel_case_record() {
        let json = r#"{
            "nationalId": "NIN-001",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "dateOfBirth": "1990-01-01",
            "gender": "F",
            "contactInfo": "ada@example.com"
        }"#;
        let p: Patient = serde_json::from_str(json).unwrap();
        assert_eq!(p, test_patient());
    }
}
