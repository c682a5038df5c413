use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use accessgate_auth::AuthzError;

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::InvalidRequest(e) => json_error(StatusCode::BAD_REQUEST, "invalid_request", e.to_string()),
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
