use axum::{
    routing::{get, post},
    Router,
};

pub mod access;
pub mod roles;
pub mod system;

/// Router for every endpoint the gateway serves.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::index))
        .route("/health", get(system::health))
        .route("/check-session", post(access::check_session))
        .route("/validate-session", post(access::validate_session))
        .nest("/roles", roles::router())
}
