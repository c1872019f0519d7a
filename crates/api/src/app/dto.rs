//! Request/response DTOs and the response envelope.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use gatekit_auth::Identity;
use gatekit_core::{IdentityId, TenantId};

/// Standard success envelope: `{"data", "message", "status_code"}`.
pub fn envelope(
    status: StatusCode,
    data: impl Serialize,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "data": data,
            "message": message.into(),
            "status_code": status.as_u16(),
        })),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct TokenPairDto {
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity as exposed over the wire (no password hash).
#[derive(Debug, Serialize)]
pub struct IdentityDto {
    pub id: IdentityId,
    pub email: String,
    pub memberships: Vec<TenantId>,
    pub active_tenant: TenantId,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Identity> for IdentityDto {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            memberships: identity.memberships.clone(),
            active_tenant: identity.active_tenant,
            role: identity.role.as_str().to_string(),
            is_active: identity.is_active,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// OAuth2-style password form (`username` carries the email).
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchWorkspaceRequest {
    pub tenant_id: TenantId,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub identity_id: IdentityId,
    pub role: String,
}
