use axum::Router;

pub mod diseases;
pub mod incidents;
pub mod locations;
pub mod patients;
pub mod records;
pub mod symptoms;
pub mod system;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/disease", diseases::router())
        .nest("/patient", patients::router())
        .nest("/location", locations::router())
        .nest("/symptom", symptoms::router())
        .nest("/incident", incidents::router())
}
