//! Application services (one per record kind).
//!
//! Every write runs the same pipeline:
//!
//! ```text
//! request
//!   ↓
//! 1. Reference checks + uniqueness checks (read-only)
//!   ↓
//! 2. Merge the sparse patch into a snapshot (pure)
//!   ↓
//! 3. Commit, version-checked (see `commit`)
//! ```
//!
//! Reads go straight to the store. Errors from every stage are mapped into
//! [`ServiceError`] and never swallowed.

use std::sync::Arc;

use thiserror::Error;

use incidents_core::{DomainError, EntityKind, SymptomId, join_ids};
use incidents_domain::{Disease, Location, Patient, Symptom};

use crate::commit::CommitError;
use crate::reference::ReferenceError;
use crate::store::{Store, StoreError};
use crate::uniqueness::UniquenessError;

pub mod incident;
pub mod record;
pub mod views;

pub use incident::IncidentService;
pub use record::RecordService;
pub use views::{CaseSummary, IncidentDetails, IncidentListing, IncidentView};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// One service per record kind, sharing a single store.
pub struct Services<S: ?Sized> {
    pub diseases: RecordService<S, Disease>,
    pub patients: RecordService<S, Patient>,
    pub locations: RecordService<S, Location>,
    pub symptoms: RecordService<S, Symptom>,
    pub incidents: IncidentService<S>,
}

impl<S: Store + ?Sized> Services<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            diseases: RecordService::new(Arc::clone(&store)),
            patients: RecordService::new(Arc::clone(&store)),
            locations: RecordService::new(Arc::clone(&store)),
            symptoms: RecordService::new(Arc::clone(&store)),
            incidents: IncidentService::new(store),
        }
    }
}

/// Outcome taxonomy surfaced to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The disease id was missing or not a positive id.
    #[error("invalid disease id")]
    InvalidDisease,

    #[error("disease {0} does not exist")]
    UnknownDisease(incidents_core::DiseaseId),

    #[error("patient {0} does not exist")]
    UnknownPatient(incidents_core::PatientId),

    #[error("location {0} does not exist")]
    UnknownLocation(incidents_core::LocationId),

    #[error("symptoms do not exist: {}", join_ids(.0))]
    UnknownSymptoms(Vec<SymptomId>),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("a {kind} with key '{key}' already exists")]
    DuplicateKey { kind: EntityKind, key: String },

    /// Absent at lookup time or deleted before commit; callers cannot tell which.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// The row changed between read and commit.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// Unexpected store failure, propagated unchanged.
    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    pub fn not_found(kind: EntityKind, id: impl Into<i64>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { kind, id } => ServiceError::NotFound { kind, id },
            StoreError::Conflict(msg) => ServiceError::Concurrency(msg),
            StoreError::UniqueViolation { kind, key } => ServiceError::DuplicateKey { kind, key },
            other => ServiceError::Store(other),
        }
    }
}

impl From<ReferenceError> for ServiceError {
    fn from(value: ReferenceError) -> Self {
        match value {
            ReferenceError::UnknownDisease(id) => ServiceError::UnknownDisease(id),
            ReferenceError::UnknownPatient(id) => ServiceError::UnknownPatient(id),
            ReferenceError::UnknownLocation(id) => ServiceError::UnknownLocation(id),
            ReferenceError::UnknownSymptoms(ids) => ServiceError::UnknownSymptoms(ids),
            ReferenceError::Store(e) => e.into(),
        }
    }
}

impl From<UniquenessError> for ServiceError {
    fn from(value: UniquenessError) -> Self {
        match value {
            UniquenessError::DuplicateKey { kind, key } => ServiceError::DuplicateKey { kind, key },
            UniquenessError::Store(e) => e.into(),
        }
    }
}

impl From<CommitError> for ServiceError {
    fn from(value: CommitError) -> Self {
        match value {
            CommitError::NotFound { kind, id } => ServiceError::NotFound { kind, id },
            CommitError::Concurrency(msg) => ServiceError::Concurrency(msg),
            CommitError::DuplicateKey { kind, key } => ServiceError::DuplicateKey { kind, key },
            CommitError::Store(e) => ServiceError::Store(e),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
        }
    }
}
