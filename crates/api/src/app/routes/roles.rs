//! Local policy audit endpoints.
//!
//! These expose the role table the gateway falls back to when the remote
//! policy engine cannot be reached, to help answer "why was this denied?".

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::dto::{ExplainQuery, RoleView};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_roles))
        .route("/:name", get(get_role))
        .route("/:name/explain", get(explain_role))
}

fn view(services: &AppServices, name: &str) -> Option<RoleView> {
    let policy = services.policy();
    let definition = policy.get(name)?;
    let effective = policy.effective_grants(name).into_iter().map(str::to_string);
    Some(RoleView::new(definition, effective))
}

/// GET /roles - every role with its own and effective grants
pub async fn list_roles(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let roles: Vec<RoleView> = services
        .policy()
        .roles()
        .filter_map(|definition| view(&services, definition.name.as_str()))
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "roles": roles }))).into_response()
}

/// GET /roles/:name
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> axum::response::Response {
    match view(&services, &name) {
        Some(role) => (StatusCode::OK, Json(serde_json::json!({ "role": role }))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "role not found"),
    }
}

/// GET /roles/:name/explain?action=&ownerMatch=
///
/// Unknown roles are explained (denied, `unknown_role`) rather than 404ed, to
/// mirror what a live request with that role would get.
pub async fn explain_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
    Query(query): Query<ExplainQuery>,
) -> axum::response::Response {
    if query.action.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", "action is required");
    }

    let explanation = services.policy().explain(&name, &query.action, query.owner_match);
    (StatusCode::OK, Json(explanation)).into_response()
}
