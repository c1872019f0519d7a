//! Liveness and identity introspection endpoints.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::app::dto::{envelope, ChangePasswordRequest, IdentityDto};
use crate::app::routes::common::current_identity;
use crate::app::{errors, AppServices};

pub async fn health() -> axum::response::Response {
    envelope(StatusCode::OK, json!({ "status": "ok" }), "healthy")
}

/// GET /me - the identity behind the presented bearer credential.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> axum::response::Response {
    match current_identity(&services, &headers).await {
        Ok((identity, _, _)) => envelope(StatusCode::OK, IdentityDto::from(&identity), "OK"),
        Err(res) => res,
    }
}

/// PUT /me/password - replace the caller's password.
///
/// Existing tokens stay valid; clients that want an immediate cut-off log
/// out their old credential as well.
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> axum::response::Response {
    let (mut identity, _, _) = match current_identity(&services, &headers).await {
        Ok(auth) => auth,
        Err(res) => return res,
    };

    let password_hash = match services.hasher.hash(&req.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not update password.",
            );
        }
    };

    identity.password_hash = password_hash;
    identity.updated_at = Utc::now();
    if let Err(e) = services.identities.save(identity).await {
        return errors::domain_error_to_response(e);
    }

    envelope(StatusCode::OK, json!({}), "Password updated")
}
