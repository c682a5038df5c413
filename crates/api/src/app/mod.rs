//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: upstream clients, decision engine, session validator
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use accessgate_infra::ServiceConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, ServiceError};

/// Build the full HTTP router around already-wired services.
pub fn build_app(services: Arc<AppServices>) -> Router {
    routes::router()
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_id_middleware)))
}

/// Build the router from configuration (public entrypoint used by `main.rs`).
pub fn build_app_from_config(config: &ServiceConfig) -> Result<Router, ServiceError> {
    let services = services::build_services(config)?;
    Ok(build_app(Arc::new(services)))
}
