use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use incidents_core::{NaturalKey, RecordId, Stored};
use incidents_domain::Merge;

use crate::commit::commit;
use crate::store::{EntityStore, UniqueIndex};
use crate::uniqueness::check_unique;

use super::{ServiceError, ServiceResult};

/// CRUD for an independent record kind (disease, patient, location, symptom).
pub struct RecordService<S: ?Sized, E> {
    store: Arc<S>,
    _record: PhantomData<fn() -> E>,
}

impl<S: ?Sized, E> Clone for RecordService<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<S, E> RecordService<S, E>
where
    S: EntityStore<E> + UniqueIndex<E> + ?Sized,
    E: NaturalKey + Merge,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    #[instrument(skip(self, record), fields(kind = %E::KIND), err)]
    pub async fn create(&self, record: E) -> ServiceResult<Stored<E>> {
        record.validate()?;
        check_unique::<E, S>(&self.store, &record.natural_key(), None).await?;

        let stored = self.store.insert(record).await?;
        info!(id = %stored.id, "created");
        Ok(stored)
    }

    pub async fn get(&self, id: E::Id) -> ServiceResult<Stored<E>> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(E::KIND, id.raw()))
    }

    pub async fn list(&self) -> ServiceResult<Vec<Stored<E>>> {
        Ok(self.store.list_all().await?)
    }

    /// Read, merge, check the merged key, commit.
    ///
    /// A patch that changes nothing succeeds without writing, so the version
    /// is left as it was.
    #[instrument(skip(self, patch), fields(kind = %E::KIND, id = %id), err)]
    pub async fn update(&self, id: E::Id, patch: &E::Patch) -> ServiceResult<Stored<E>> {
        let current = self.get(id).await?;
        let merged = current.record.merge(patch);
        if merged == current.record {
            debug!("patch is a no-op");
            return Ok(current);
        }

        merged.validate()?;
        check_unique::<E, S>(&self.store, &merged.natural_key(), Some(id)).await?;

        let committed = commit(&*self.store, current.with_record(merged)).await?;
        info!(version = committed.version, "updated");
        Ok(committed)
    }

    #[instrument(skip(self), fields(kind = %E::KIND), err)]
    pub async fn delete(&self, id: E::Id) -> ServiceResult<()> {
        self.store.delete(id).await?;
        info!(id = %id, "deleted");
        Ok(())
    }
}
