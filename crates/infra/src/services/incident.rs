//! Incident aggregate service.
//!
//! Incident is the only record with references: one required disease, an
//! optional patient and location, and an ordered symptom set. Creates and
//! updates validate those references before anything is written.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use incidents_core::{EntityKind, IncidentId, Record, RecordId, Stored};
use incidents_domain::{Incident, IncidentPatch, Merge, NewIncident};

use crate::commit::commit;
use crate::reference::{References, validate_references};
use crate::store::{EntityStore, Store};

use super::views::Catalog;
use super::{CaseSummary, IncidentDetails, IncidentListing, IncidentView, ServiceError, ServiceResult};

pub struct IncidentService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for IncidentService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> IncidentService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validate, default, persist, and project a new incident.
    ///
    /// `date_reported` defaults to now and `symptom_ids` to empty. Symptom
    /// names in the result follow the order the ids were supplied in.
    #[instrument(skip(self, new), fields(disease_id = %new.disease_id, id = tracing::field::Empty), err)]
    pub async fn create(&self, new: NewIncident) -> ServiceResult<IncidentView> {
        if new.disease_id.is_unset() {
            debug!("rejected unset disease id");
            return Err(ServiceError::InvalidDisease);
        }
        validate_references(&*self.store, &References::from(&new)).await?;

        let incident = Incident::from_new(new, Utc::now());
        incident.validate()?;

        let stored = EntityStore::<Incident>::insert(&*self.store, incident).await?;
        tracing::Span::current().record("id", stored.id.raw());
        info!("incident created");

        self.project(&stored).await
    }

    pub async fn get(&self, id: IncidentId) -> ServiceResult<Stored<Incident>> {
        EntityStore::<Incident>::find(&*self.store, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Incident, id))
    }

    pub async fn view(&self, id: IncidentId) -> ServiceResult<IncidentView> {
        let row = self.get(id).await?;
        self.project(&row).await
    }

    pub async fn details(&self, id: IncidentId) -> ServiceResult<IncidentDetails> {
        let row = self.get(id).await?;
        let catalog = Catalog::for_incident(&*self.store, &row.record).await?;
        Ok(catalog.details(&row)?)
    }

    pub async fn list(&self) -> ServiceResult<Vec<IncidentView>> {
        let rows = EntityStore::<Incident>::list_all(&*self.store).await?;
        let catalog = Catalog::load_all(&*self.store).await?;
        Ok(rows
            .iter()
            .map(|row| catalog.view(row))
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn list_summaries(&self) -> ServiceResult<Vec<IncidentListing>> {
        let rows = EntityStore::<Incident>::list_all(&*self.store).await?;
        let catalog = Catalog::load_all(&*self.store).await?;
        Ok(rows
            .iter()
            .map(|row| catalog.listing(row))
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn case_summary(&self) -> ServiceResult<Vec<CaseSummary>> {
        let rows = EntityStore::<Incident>::list_all(&*self.store).await?;
        let catalog = Catalog::load_all(&*self.store).await?;
        Ok(catalog.summarize(&rows)?)
    }

    /// Apply a sparse patch.
    ///
    /// Only the references present in the patch are validated, and they are
    /// validated before the incident is looked up. Scalar fields merge by
    /// presence; a present `symptom_ids` replaces the whole set. An empty or
    /// no-op patch succeeds without writing.
    #[instrument(skip(self, patch), fields(id = %id), err)]
    pub async fn update(&self, id: IncidentId, patch: &IncidentPatch) -> ServiceResult<Stored<Incident>> {
        if patch.disease_id.as_set().is_some_and(|d| d.is_unset()) {
            return Err(ServiceError::InvalidDisease);
        }
        validate_references(&*self.store, &References::from(patch)).await?;

        let current = self.get(id).await?;
        let merged = current.record.merge(patch);
        if merged == current.record {
            debug!(empty = patch.is_empty(), "patch is a no-op");
            return Ok(current);
        }

        let committed = commit(&*self.store, current.with_record(merged)).await?;
        info!(version = committed.version, "incident updated");
        Ok(committed)
    }

    /// Remove the incident and its symptom links. Referenced rows are untouched.
    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: IncidentId) -> ServiceResult<()> {
        EntityStore::<Incident>::delete(&*self.store, id).await?;
        info!(id = %id, "incident deleted");
        Ok(())
    }

    async fn project(&self, row: &Stored<Incident>) -> ServiceResult<IncidentView> {
        let catalog = Catalog::for_incident(&*self.store, &row.record).await?;
        Ok(catalog.view(row)?)
    }
}
