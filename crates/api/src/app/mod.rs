//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the shared engine services
//! - `routes/`: HTTP routes + handlers (one file per record kind)
//! - `dto.rs`: request bodies and JSON response shapes
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .layer(ServiceBuilder::new().layer(Extension(Arc::new(services))))
}
