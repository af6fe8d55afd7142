use axum::Router;

use incidents_domain::Patient;
use incidents_infra::services::RecordService;
use incidents_infra::store::Store;

use crate::app::dto::CreatePatientRequest;
use crate::app::services::AppServices;

use super::records::{self, RecordResource};

impl RecordResource for Patient {
    type Create = CreatePatientRequest;

    fn service(services: &AppServices) -> &RecordService<dyn Store, Self> {
        &services.patients
    }
}

pub fn router() -> Router {
    records::router::<Patient>()
}
