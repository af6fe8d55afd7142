use serde::{Deserialize, Serialize};

use incidents_core::{DiseaseId, DomainResult, EntityKind, NaturalKey, Patch, Record};

use crate::merge::{Merge, merge_text, require_text};

/// A disease; `name` is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disease {
    pub name: String,
    pub description: String,
}

impl Disease {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Record for Disease {
    type Id = DiseaseId;

    const KIND: EntityKind = EntityKind::Disease;

    fn validate(&self) -> DomainResult<()> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)
    }
}

impl NaturalKey for Disease {
    type Key = String;

    fn natural_key(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiseasePatch {
    pub name: Patch<String>,
    pub description: Patch<String>,
}

impl Merge for Disease {
    type Patch = DiseasePatch;

    fn merge(&self, patch: &DiseasePatch) -> Self {
        Self {
            name: merge_text(&self.name, &patch.name),
            description: merge_text(&self.description, &patch.description),
        }
    }
}
