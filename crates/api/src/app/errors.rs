//! Consistent JSON error responses and error-to-status mapping.

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;

use gatekit_auth::MembershipError;
use gatekit_core::DomainError;
use gatekit_policy::{AuthzError, PolicyError};

/// Standard error envelope: `{"message", "status_code", "data": {}}`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "message": message.into(),
            "status_code": status.as_u16(),
            "data": {},
        })),
    )
        .into_response()
}

/// 401 with the bearer challenge. Authentication failures are never retried
/// automatically; the challenge tells the client to obtain fresh credentials.
pub fn unauthorized(message: impl Into<String>) -> axum::response::Response {
    let mut res = json_error(StatusCode::UNAUTHORIZED, message);
    res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        header::HeaderValue::from_static("Bearer"),
    );
    res
}

/// Denied → 403; an outage also blocks the action but maps to 503 so callers
/// can tell "no" apart from "could not determine".
pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::Denied => json_error(StatusCode::FORBIDDEN, "Permission denied."),
        AuthzError::PolicyEngineUnavailable(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Authorization service unavailable.",
        ),
    }
}

pub fn membership_error_to_response(err: MembershipError) -> axum::response::Response {
    match err {
        MembershipError::NotAMember(_) => json_error(StatusCode::BAD_REQUEST, err.to_string()),
        MembershipError::LastWorkspaceRemoval => json_error(StatusCode::CONFLICT, err.to_string()),
    }
}

/// Mapping for provisioning calls to the policy engine at registration time.
pub fn provisioning_error_to_response(err: PolicyError) -> axum::response::Response {
    match err {
        PolicyError::Conflict => json_error(
            StatusCode::CONFLICT,
            "A user with this key already exists.",
        ),
        PolicyError::Unavailable(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Authorization service unavailable.",
        ),
        PolicyError::Api { status, message } => json_error(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            message,
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => {
            json_error(StatusCode::BAD_REQUEST, err.to_string())
        }
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, err.to_string()),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "Not found."),
        DomainError::InvariantViolation(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
