use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use incidents_core::IncidentId;
use incidents_domain::{IncidentPatch, NewIncident};

use crate::app::dto::Items;
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/all", get(list_incidents))
        .route("/list", get(list_summaries))
        .route("/summary", get(case_summary))
        .route("/details/:id", get(get_details))
        .route("/create", post(create_incident))
        .route(
            "/:id",
            get(get_incident).put(update_incident).delete(delete_incident),
        )
}

fn parse_incident_id(raw: &str) -> Result<IncidentId, axum::response::Response> {
    errors::parse_id(raw)
}

pub async fn create_incident(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewIncident>,
) -> axum::response::Response {
    match services.incidents.create(body).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_incidents(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.incidents.list().await {
        Ok(items) => Json(Items { items }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_summaries(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.incidents.list_summaries().await {
        Ok(items) => Json(Items { items }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn case_summary(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.incidents.case_summary().await {
        Ok(items) => Json(Items { items }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_incident(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_incident_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.incidents.view(id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_details(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_incident_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.incidents.details(id).await {
        Ok(details) => Json(details).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Sparse update: absent or `null` fields keep their current value, and a
/// present `symptomIds` replaces the whole set.
pub async fn update_incident(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<IncidentPatch>,
) -> axum::response::Response {
    let id = match parse_incident_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.incidents.update(id, &patch).await {
        Ok(row) => {
            tracing::debug!(version = row.version, "incident update applied");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_incident(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_incident_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.incidents.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
