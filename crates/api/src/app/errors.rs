use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use incidents_core::RecordId;
use incidents_infra::services::ServiceError;

pub const INTERNAL_MESSAGE: &str = "An unexpected error occurred.";

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        ServiceError::InvalidDisease => json_error(StatusCode::BAD_REQUEST, "invalid_disease", message),
        ServiceError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        ServiceError::UnknownDisease(_)
        | ServiceError::UnknownPatient(_)
        | ServiceError::UnknownLocation(_)
        | ServiceError::UnknownSymptoms(_) => {
            json_error(StatusCode::NOT_FOUND, "unknown_reference", message)
        }
        ServiceError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message),
        ServiceError::DuplicateKey { .. } => json_error(StatusCode::CONFLICT, "duplicate_key", message),
        ServiceError::Concurrency(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        ServiceError::Store(e) => {
            error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_MESSAGE)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Path ids are plain integers.
pub fn parse_id<I: RecordId>(raw: &str) -> Result<I, axum::response::Response> {
    raw.trim()
        .parse::<i64>()
        .map(I::from_raw)
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("'{raw}' is not a valid id")))
}
