use async_trait::async_trait;
use thiserror::Error;

use incidents_core::{EntityKind, NaturalKey, Record, Stored};
use incidents_domain::{Disease, Incident, Location, Patient, Symptom};

/// Failures reported by an entity store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No row with this id.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// The version check on update failed: the row vanished or moved on.
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    /// A unique index rejected the write.
    #[error("duplicate {kind} key '{key}'")]
    UniqueViolation { kind: EntityKind, key: String },

    /// A foreign-key constraint rejected the write.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// A stored row references something that no longer exists.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Connection, lock or driver failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence boundary for one record kind.
///
/// Implementations own the rows and enforce the unique and foreign-key
/// constraints, including the delete cascade policy. Callers never see SQL.
#[async_trait]
pub trait EntityStore<E: Record>: Send + Sync {
    async fn find(&self, id: E::Id) -> Result<Option<Stored<E>>, StoreError>;

    /// Rows for the ids that exist, in the order requested. Missing ids are skipped.
    async fn find_many(&self, ids: &[E::Id]) -> Result<Vec<Stored<E>>, StoreError> {
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = self.find(*id).await? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Insert a new row; the store assigns the id and version 1.
    async fn insert(&self, record: E) -> Result<Stored<E>, StoreError>;

    /// Overwrite the whole row if its stored version still equals `row.version`.
    ///
    /// Returns the row as persisted, with the bumped version. A missing row or
    /// a version mismatch yields [`StoreError::Conflict`].
    async fn update(&self, row: Stored<E>) -> Result<Stored<E>, StoreError>;

    async fn delete(&self, id: E::Id) -> Result<(), StoreError>;

    /// All rows ordered by id.
    async fn list_all(&self) -> Result<Vec<Stored<E>>, StoreError>;
}

/// Natural-key lookups backing the uniqueness checks.
#[async_trait]
pub trait UniqueIndex<E: NaturalKey>: Send + Sync {
    /// Whether a row other than `exclude` carries `key`.
    async fn exists_by_key(&self, key: &E::Key, exclude: Option<E::Id>) -> Result<bool, StoreError>;
}

/// Everything the services need from a backend.
pub trait Store:
    EntityStore<Disease>
    + UniqueIndex<Disease>
    + EntityStore<Patient>
    + UniqueIndex<Patient>
    + EntityStore<Location>
    + UniqueIndex<Location>
    + EntityStore<Symptom>
    + UniqueIndex<Symptom>
    + EntityStore<Incident>
    + Send
    + Sync
    + 'static
{
}

impl<T> Store for T where
    T: EntityStore<Disease>
        + UniqueIndex<Disease>
        + EntityStore<Patient>
        + UniqueIndex<Patient>
        + EntityStore<Location>
        + UniqueIndex<Location>
        + EntityStore<Symptom>
        + UniqueIndex<Symptom>
        + EntityStore<Incident>
        + Send
        + Sync
        + 'static
{
}
