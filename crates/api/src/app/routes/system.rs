use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::app::dto::{DependencyReport, HealthQuery};
use crate::app::services::AppServices;

const SERVICE_NAME: &str = "access-control";

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "status": "running",
        "endpoints": ["/health", "/check-session", "/validate-session", "/roles"],
    }))
}

/// Always 200: a dependency being down degrades the report, not the probe.
pub async fn health(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<HealthQuery>,
) -> impl IntoResponse {
    if query.quick {
        return Json(json!({ "status": "healthy", "service": SERVICE_NAME }));
    }

    let mut dependencies = DependencyReport::default();
    if query.detailed {
        let upstreams = &services.upstreams;
        let (auth, rbac, users) = tokio::join!(
            services.health.check(&upstreams.auth),
            services.health.check(&upstreams.rbac),
            services.health.check(&upstreams.user_management),
        );
        dependencies = DependencyReport {
            auth: Some(auth),
            rbac: Some(rbac),
            user_management: Some(users),
        };
    }

    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptimeSeconds": services.started_at.elapsed().as_secs(),
        "dependencies": dependencies,
    }))
}
