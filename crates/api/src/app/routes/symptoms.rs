use axum::Router;

use incidents_domain::Symptom;
use incidents_infra::services::RecordService;
use incidents_infra::store::Store;

use crate::app::dto::CreateSymptomRequest;
use crate::app::services::AppServices;

use super::records::{self, RecordResource};

impl RecordResource for Symptom {
    type Create = CreateSymptomRequest;

    fn service(services: &AppServices) -> &RecordService<dyn Store, Self> {
        &services.symptoms
    }
}

pub fn router() -> Router {
    records::router::<Symptom>()
}
