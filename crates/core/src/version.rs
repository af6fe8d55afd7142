//! Optimistic concurrency token checks.

/// The version a writer read; a write succeeds only if the row is still there.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(pub u64);

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }
}
