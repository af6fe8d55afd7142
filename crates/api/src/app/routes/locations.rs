use axum::Router;

use incidents_domain::Location;
use incidents_infra::services::RecordService;
use incidents_infra::store::Store;

use crate::app::dto::CreateLocationRequest;
use crate::app::services::AppServices;

use super::records::{self, RecordResource};

impl RecordResource for Location {
    type Create = CreateLocationRequest;

    fn service(services: &AppServices) -> &RecordService<dyn Store, Self> {
        &services.locations
    }
}

pub fn router() -> Router {
    records::router::<Location>()
}
