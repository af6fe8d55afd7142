//! Concurrency resolution for whole-row commits.
//!
//! A commit hands a merged snapshot to the store, which overwrites the row
//! only if its version still matches the one read. When that check fails the
//! row is looked up again:
//!
//! ```text
//! update(row) ── ok ──────────────────────────────▶ committed row
//!      │
//!      └─ version conflict ─▶ find(id) ─ None ────▶ NotFound (deleted concurrently)
//!                                      └ Some ────▶ Concurrency (changed concurrently)
//! ```
//!
//! There is no automatic retry; the caller decides whether to re-read and
//! resubmit.

use thiserror::Error;
use tracing::{instrument, warn};

use incidents_core::{EntityKind, Record, RecordId, Stored};

use crate::store::{EntityStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    /// The row vanished between read and commit (or never existed).
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// The row still exists but changed since it was read.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// The store's unique index rejected the write.
    #[error("a {kind} with key '{key}' already exists")]
    DuplicateKey { kind: EntityKind, key: String },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CommitError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { kind, id } => CommitError::NotFound { kind, id },
            StoreError::Conflict(msg) => CommitError::Concurrency(msg),
            StoreError::UniqueViolation { kind, key } => CommitError::DuplicateKey { kind, key },
            other => CommitError::Store(other),
        }
    }
}

/// Persist `row` as a whole-row overwrite guarded by its version.
#[instrument(skip(store, row), fields(kind = %E::KIND, id = %row.id, version = row.version), err)]
pub async fn commit<E, S>(store: &S, row: Stored<E>) -> Result<Stored<E>, CommitError>
where
    E: Record,
    S: EntityStore<E> + ?Sized,
{
    let id = row.id;
    let read_version = row.version;

    match store.update(row).await {
        Ok(committed) => Ok(committed),
        Err(StoreError::Conflict(msg)) => match store.find(id).await? {
            None => {
                warn!(kind = %E::KIND, id = %id, "row deleted concurrently");
                Err(CommitError::NotFound {
                    kind: E::KIND,
                    id: id.raw(),
                })
            }
            Some(current) => {
                warn!(
                    kind = %E::KIND,
                    id = %id,
                    read_version,
                    current_version = current.version,
                    "row modified concurrently"
                );
                Err(CommitError::Concurrency(msg))
            }
        },
        Err(other) => Err(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use incidents_domain::Disease;

    #[tokio::test]
    async fn commit_bumps_the_version() {
        let store = InMemoryStore::new();
        let row = EntityStore::<Disease>::insert(&store, Disease::new("Flu", "x")).await.unwrap();
        let committed = commit(&store, row.with_record(Disease::new("Flu", "y")))
            .await
            .unwrap();
        assert_eq!(committed.version, 2);
        assert_eq!(committed.record.description, "y");
    }

    #[tokio::test]
    async fn changed_row_is_a_concurrency_conflict() {
        let store = InMemoryStore::new();
        let snapshot = EntityStore::<Disease>::insert(&store, Disease::new("Flu", "x")).await.unwrap();

        commit(&store, snapshot.with_record(Disease::new("Flu", "winner")))
            .await
            .unwrap();
        let err = commit(&store, snapshot.with_record(Disease::new("Flu", "loser")))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::Concurrency(_)));

        let current = EntityStore::<Disease>::find(&store, snapshot.id).await.unwrap().unwrap();
        assert_eq!(current.record.description, "winner");
    }

    #[tokio::test]
    async fn vanished_row_is_not_found() {
        let store = InMemoryStore::new();
        let snapshot = EntityStore::<Disease>::insert(&store, Disease::new("Flu", "x")).await.unwrap();
        EntityStore::<Disease>::delete(&store, snapshot.id).await.unwrap();

        let err = commit(&store, snapshot.with_record(Disease::new("Flu", "y")))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CommitError::NotFound {
                kind: EntityKind::Disease,
                id: snapshot.id.raw(),
            }
        );
    }

    #[tokio::test]
    async fn unique_violation_surfaces_as_duplicate_key() {
        let store = InMemoryStore::new();
        EntityStore::<Disease>::insert(&store, Disease::new("Flu", "x")).await.unwrap();
        let other = EntityStore::<Disease>::insert(&store, Disease::new("Measles", "x"))
            .await
            .unwrap();

        let err = commit(&store, other.with_record(Disease::new("Flu", "x")))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::DuplicateKey { key, .. } if key == "Flu"));
    }
}
