use serde::{Deserialize, Serialize};

use incidents_core::{DomainResult, EntityKind, LocationId, NaturalKey, Patch, Record};

use crate::merge::{Merge, merge_text, require_text};

/// A location; the `(city, country)` pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub city: String,
    pub country: String,
}

impl Location {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }

    /// `"city, country"`, as shown on incident projections.
    pub fn label(&self) -> String {
        self.natural_key().to_string()
    }
}

/// Composite natural key of a [`Location`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey {
    pub city: String,
    pub country: String,
}

impl core::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

impl Record for Location {
    type Id = LocationId;

    const KIND: EntityKind = EntityKind::Location;

    fn validate(&self) -> DomainResult<()> {
        require_text("city", &self.city)?;
        require_text("country", &self.country)
    }
}

impl NaturalKey for Location {
    type Key = LocationKey;

    fn natural_key(&self) -> LocationKey {
        LocationKey {
            city: self.city.clone(),
            country: self.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationPatch {
    pub city: Patch<String>,
    pub country: Patch<String>,
}

impl Merge for Location {
    type Patch = LocationPatch;

    fn merge(&self, patch: &LocationPatch) -> Self {
        Self {
            city: merge_text(&self.city, &patch.city),
            country: merge_text(&self.country, &patch.country),
        }
    }
}
