use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use incidents_core::{DomainError, Record, RecordId, Stored};
use incidents_domain::{Disease, Location, Patient, Symptom};

// -------------------------
// Request DTOs
// -------------------------
//
// Missing text fields default to empty and are rejected by record
// validation, so every create failure comes back in the same JSON shape.

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateDiseaseRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateSymptomRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateLocationRequest {
    pub city: String,
    pub country: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: String,
    pub contact_info: String,
}

impl TryFrom<CreateDiseaseRequest> for Disease {
    type Error = DomainError;

    fn try_from(body: CreateDiseaseRequest) -> Result<Self, Self::Error> {
        Ok(Disease::new(body.name, body.description))
    }
}

impl TryFrom<CreateSymptomRequest> for Symptom {
    type Error = DomainError;

    fn try_from(body: CreateSymptomRequest) -> Result<Self, Self::Error> {
        Ok(Symptom::new(body.name, body.description))
    }
}

impl TryFrom<CreateLocationRequest> for Location {
    type Error = DomainError;

    fn try_from(body: CreateLocationRequest) -> Result<Self, Self::Error> {
        Ok(Location::new(body.city, body.country))
    }
}

impl TryFrom<CreatePatientRequest> for Patient {
    type Error = DomainError;

    fn try_from(body: CreatePatientRequest) -> Result<Self, Self::Error> {
        Ok(Patient {
            national_id: body.national_id,
            first_name: body.first_name,
            last_name: body.last_name,
            date_of_birth: body.date_of_birth.ok_or_else(|| DomainError::required("dateOfBirth"))?,
            gender: body.gender,
            contact_info: body.contact_info,
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// A stored row as JSON: `id`, `version`, then the record's own fields.
#[derive(Debug, Serialize)]
pub struct RecordBody<'a, E> {
    pub id: i64,
    pub version: u64,
    #[serde(flatten)]
    pub record: &'a E,
}

impl<'a, E: Record> RecordBody<'a, E> {
    pub fn new(row: &'a Stored<E>) -> Self {
        Self {
            id: row.id.raw(),
            version: row.version,
            record: &row.record,
        }
    }
}

/// List responses wrap their rows: `{"items": [...]}`.
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}
