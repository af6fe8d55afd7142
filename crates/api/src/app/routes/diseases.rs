use axum::Router;

use incidents_domain::Disease;
use incidents_infra::services::RecordService;
use incidents_infra::store::Store;

use crate::app::dto::CreateDiseaseRequest;
use crate::app::services::AppServices;

use super::records::{self, RecordResource};

impl RecordResource for Disease {
    type Create = CreateDiseaseRequest;

    fn service(services: &AppServices) -> &RecordService<dyn Store, Self> {
        &services.diseases
    }
}

pub fn router() -> Router {
    records::router::<Disease>()
}
