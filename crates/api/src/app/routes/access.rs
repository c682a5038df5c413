//! Authorization and session endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use accessgate_core::SessionId;

use crate::app::dto::{CheckAccessRequest, DecisionResponse, SessionResponse, ValidateSessionRequest};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::middleware::extract_bearer;

/// POST /check-session - decide whether the bearer may perform an action.
///
/// Denials caused by a missing or invalid credential answer 401; every
/// other decision, allowed or not, answers 200.
pub async fn check_session(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Result<Json<CheckAccessRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text());
        }
    };

    let session_id = body.session_id.clone();
    let request = body.into_authorization_request(extract_bearer(&headers));

    let decision = match services.engine.decide(&request).await {
        Ok(decision) => decision,
        Err(e) => return errors::authz_error_to_response(e),
    };

    let status = if decision.source().is_authentication_failure() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };
    (status, Json(DecisionResponse::new(&decision, session_id))).into_response()
}

/// POST /validate-session - check a session with the user-management service.
pub async fn validate_session(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Result<Json<ValidateSessionRequest>, JsonRejection>,
) -> axum::response::Response {
    let Some(token) = extract_bearer(&headers) else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "missing_token",
            "no authentication token provided",
        );
    };

    let session_id = match body.map(|Json(b)| b.session_id.parse::<SessionId>()) {
        Ok(Ok(id)) => id,
        Ok(Err(e)) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", e.to_string()),
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text());
        }
    };

    let status = services.sessions.validate(&session_id, &token).await;
    (StatusCode::OK, Json(SessionResponse::from(status))).into_response()
}
