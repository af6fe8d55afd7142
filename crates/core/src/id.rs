//! Strongly-typed surrogate identifiers.
//!
//! Every record kind gets its own integer id type so a `PatientId` can never be
//! passed where a `DiseaseId` is expected. Ids are assigned by the store.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::entity::RecordId;
use crate::error::DomainError;

macro_rules! impl_int_newtype {
    ($t:ident, $name:literal) => {
        #[doc = concat!("Identifier of a ", $name, " row.")]
        #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(i64);

        impl $t {
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> i64 {
                self.0
            }

            /// Zero or negative ids never name a stored row.
            pub const fn is_unset(self) -> bool {
                self.0 <= 0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = i64::from_str(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(raw))
            }
        }

        impl RecordId for $t {
            fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            fn raw(self) -> i64 {
                self.0
            }
        }
    };
}

impl_int_newtype!(DiseaseId, "Disease");
impl_int_newtype!(PatientId, "Patient");
impl_int_newtype!(LocationId, "Location");
impl_int_newtype!(SymptomId, "Symptom");
impl_int_newtype!(IncidentId, "Incident");

/// Render a list of ids as `"4, 5"`.
pub fn join_ids<I: core::fmt::Display>(ids: &[I]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
