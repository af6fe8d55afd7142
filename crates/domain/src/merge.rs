//! Partial-update merging.
//!
//! A merge takes an immutable snapshot and a sparse patch and returns a new,
//! fully populated record. Absent fields keep the current value. For text
//! fields a blank string counts as absent, so a required field can never be
//! cleared by an update.

use incidents_core::{DomainError, DomainResult, Patch};

/// Records that accept sparse updates.
pub trait Merge: Sized {
    type Patch: core::fmt::Debug + Default + Send + Sync;

    fn merge(&self, patch: &Self::Patch) -> Self;
}

/// Merge a required text field.
pub fn merge_text(current: &str, patch: &Patch<String>) -> String {
    match patch {
        Patch::Set(value) if !value.trim().is_empty() => value.clone(),
        _ => current.to_string(),
    }
}

/// Reject a required text field that is empty or whitespace.
pub fn require_text(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::required(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_retains_current() {
        assert_eq!(merge_text("Cough", &Patch::Set(String::new())), "Cough");
        assert_eq!(merge_text("Cough", &Patch::Set("   ".into())), "Cough");
        assert_eq!(merge_text("Cough", &Patch::Absent), "Cough");
    }

    #[test]
    fn non_blank_text_overwrites() {
        assert_eq!(merge_text("Cough", &Patch::Set("Dry cough".into())), "Dry cough");
    }

    #[test]
    fn require_text_rejects_whitespace() {
        assert!(require_text("name", " \t").is_err());
        assert!(require_text("name", "Flu").is_ok());
    }
}
