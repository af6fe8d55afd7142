use serde::{Deserialize, Serialize};

use incidents_core::{DomainResult, EntityKind, NaturalKey, Patch, Record, SymptomId};

use crate::merge::{Merge, merge_text, require_text};

/// A symptom; `name` is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    pub name: String,
    pub description: String,
}

impl Symptom {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Record for Symptom {
    type Id = SymptomId;

    const KIND: EntityKind = EntityKind::Symptom;

    fn validate(&self) -> DomainResult<()> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)
    }
}

impl NaturalKey for Symptom {
    type Key = String;

    fn natural_key(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SymptomPatch {
    pub name: Patch<String>,
    pub description: Patch<String>,
}

impl Merge for Symptom {
    type Patch = SymptomPatch;

    fn merge(&self, patch: &SymptomPatch) -> Self {
        Self {
            name: merge_text(&self.name, &patch.name),
            description: merge_text(&self.description, &patch.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_in_patch_keeps_name() {
        let current = Symptom::new("Cough", "Persistent cough");
        let patch = SymptomPatch {
            name: Patch::Set(String::new()),
            description: Patch::Set("Dry cough".into()),
        };
        let merged = current.merge(&patch);
        assert_eq!(merged, Symptom::new("Cough", "Dry cough"));
    }
}
