//! Record traits: identity, natural keys, and persisted rows.

use core::fmt::{Debug, Display};
use core::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::DomainResult;
use crate::version::ExpectedVersion;

/// Surrogate integer identity shared by all record kinds.
pub trait RecordId:
    Copy + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static
{
    fn from_raw(raw: i64) -> Self;

    fn raw(self) -> i64;
}

/// The five persisted record kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Disease,
    Patient,
    Location,
    Symptom,
    Incident,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Disease => "disease",
            EntityKind::Patient => "patient",
            EntityKind::Location => "location",
            EntityKind::Symptom => "symptom",
            EntityKind::Incident => "incident",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record kind the store can persist.
///
/// Records are plain values; identity and version live in [`Stored`].
pub trait Record: Clone + Debug + PartialEq + Send + Sync + 'static {
    type Id: RecordId;

    const KIND: EntityKind;

    /// Field-level checks a record must pass before it is written.
    fn validate(&self) -> DomainResult<()> {
        Ok(())
    }
}

/// A record with a uniqueness-bearing business key.
pub trait NaturalKey: Record {
    type Key: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

    fn natural_key(&self) -> Self::Key;
}

/// A persisted row: identity, concurrency token, and the record value.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<E: Record> {
    pub id: E::Id,
    /// Starts at 1 and is bumped by the store on every successful update.
    pub version: u64,
    pub record: E,
}

impl<E: Record> Stored<E> {
    pub fn new(id: E::Id, version: u64, record: E) -> Self {
        Self { id, version, record }
    }

    /// The version a write based on this snapshot expects to find.
    pub fn expected_version(&self) -> ExpectedVersion {
        ExpectedVersion(self.version)
    }

    /// Same identity and version, new record value.
    pub fn with_record(&self, record: E) -> Self {
        Self {
            id: self.id,
            version: self.version,
            record,
        }
    }
}
