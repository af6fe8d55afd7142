//! Natural-key uniqueness checks.
//!
//! An early, friendly check only: two concurrent writers can both pass it.
//! The store's unique index remains the final authority.

use thiserror::Error;
use tracing::debug;

use incidents_core::{EntityKind, NaturalKey};

use crate::store::{StoreError, UniqueIndex};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UniquenessError {
    #[error("a {kind} with key '{key}' already exists")]
    DuplicateKey { kind: EntityKind, key: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fail if a row other than `exclude` already carries `key`.
///
/// Pass `None` on create and the row's own id on update, so re-submitting
/// unchanged data never collides with itself.
pub async fn check_unique<E, S>(
    store: &S,
    key: &E::Key,
    exclude: Option<E::Id>,
) -> Result<(), UniquenessError>
where
    E: NaturalKey,
    S: UniqueIndex<E> + ?Sized,
{
    if store.exists_by_key(key, exclude).await? {
        debug!(kind = %E::KIND, key = %key, "natural key already taken");
        return Err(UniquenessError::DuplicateKey {
            kind: E::KIND,
            key: key.to_string(),
        });
    }
    Ok(())
}
