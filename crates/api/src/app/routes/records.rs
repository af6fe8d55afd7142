//! Handlers shared by the four independent record kinds.
//!
//! Each kind plugs in through [`RecordResource`]: its create body and the
//! service that owns it. The handlers themselves are identical.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use incidents_core::{DomainError, NaturalKey};
use incidents_domain::Merge;
use incidents_infra::services::RecordService;
use incidents_infra::store::{EntityStore, Store, UniqueIndex};

use crate::app::dto::{Items, RecordBody};
use crate::app::errors;
use crate::app::services::AppServices;

pub trait RecordResource: NaturalKey + Merge<Patch: DeserializeOwned + 'static> + Serialize {
    type Create: DeserializeOwned + TryInto<Self, Error = DomainError> + Send + 'static;

    fn service(services: &AppServices) -> &RecordService<dyn Store, Self>;
}

pub fn router<R>() -> Router
where
    R: RecordResource,
    dyn Store: EntityStore<R> + UniqueIndex<R>,
{
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/:id", get(fetch::<R>).put(update::<R>).delete(remove::<R>))
}

pub async fn list<R>(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response
where
    R: RecordResource,
    dyn Store: EntityStore<R> + UniqueIndex<R>,
{
    match R::service(&services).list().await {
        Ok(rows) => Json(Items {
            items: rows.iter().map(RecordBody::new).collect(),
        })
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<R::Create>,
) -> axum::response::Response
where
    R: RecordResource,
    dyn Store: EntityStore<R> + UniqueIndex<R>,
{
    let record: R = match body.try_into() {
        Ok(record) => record,
        Err(e) => return errors::service_error_to_response(e.into()),
    };

    match R::service(&services).create(record).await {
        Ok(row) => (StatusCode::CREATED, Json(RecordBody::new(&row))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn fetch<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    R: RecordResource,
    dyn Store: EntityStore<R> + UniqueIndex<R>,
{
    let id = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match R::service(&services).get(id).await {
        Ok(row) => Json(RecordBody::new(&row)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<<R as Merge>::Patch>,
) -> axum::response::Response
where
    R: RecordResource,
    dyn Store: EntityStore<R> + UniqueIndex<R>,
{
    let id = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match R::service(&services).update(id, &patch).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove<R>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response
where
    R: RecordResource,
    dyn Store: EntityStore<R> + UniqueIndex<R>,
{
    let id = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match R::service(&services).delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
