//! Credential lifecycle endpoints: register, login, refresh, logout.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::json;

use gatekit_auth::{Identity, Role, Tenant, TokenKind};

use crate::app::dto::{
    envelope, IdentityDto, LoginForm, RefreshQuery, RegisterRequest, TokenPairDto,
};
use crate::app::routes::common::{current_identity, CREDENTIALS_MESSAGE};
use crate::app::{errors, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", get(refresh))
        .route("/logout", post(logout))
}

fn issue_pair(
    services: &AppServices,
    email: &str,
) -> Result<TokenPairDto, axum::response::Response> {
    let mint = |kind| {
        services.signer.issue(email, kind, None).map_err(|e| {
            tracing::error!(error = %e, "token issuance failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not issue tokens.")
        })
    };

    Ok(TokenPairDto {
        access_token: mint(TokenKind::Access)?,
        refresh_token: mint(TokenKind::Refresh)?,
    })
}

/// POST /auth/register - create an identity, its initial workspace, and the
/// corresponding subject at the policy engine.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<RegisterRequest>,
) -> axum::response::Response {
    let role = match req.role.as_deref() {
        None => Role::default(),
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => role,
            Err(e) => return errors::domain_error_to_response(e),
        },
    };

    match services.identities.get_by_email(req.email.trim().to_lowercase().as_str()).await {
        Ok(Some(_)) => return errors::json_error(StatusCode::CONFLICT, "User already exists."),
        Ok(None) => {}
        Err(e) => return errors::domain_error_to_response(e),
    }

    let password_hash = match services.hasher.hash(&req.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed.");
        }
    };

    let now = Utc::now();

    // Every registration gets its own initial workspace; the email is unique,
    // so the derived workspace name is too.
    let workspace_name = format!("{}-workspace", req.email.trim().to_lowercase());
    let mut tenant = match Tenant::create(&workspace_name, Some("Default workspace".to_string()), now)
    {
        Ok(tenant) => tenant,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let identity = match Identity::register(&req.email, password_hash, role, tenant.id, now) {
        Ok(identity) => identity,
        Err(e) => return errors::domain_error_to_response(e),
    };
    tenant.assign_owner(identity.id, now);

    // Register with the policy engine before persisting locally, so a PDP
    // conflict leaves no half-created records behind.
    if let Err(e) = services
        .gateway
        .create_tenant(tenant.id, &tenant.name, tenant.description.as_deref())
        .await
    {
        return errors::provisioning_error_to_response(e);
    }
    if let Err(e) = services
        .gateway
        .provision_subject(identity.id, tenant.id, role.as_str())
        .await
    {
        return errors::provisioning_error_to_response(e);
    }

    let workspace_id = tenant.id;
    if let Err(e) = services.tenants.save(tenant).await {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.identities.save(identity.clone()).await {
        // A save race lost here (e.g. duplicate email); take the freshly
        // created workspace back out so no orphaned record remains.
        if let Err(cleanup) = services.tenants.delete(workspace_id).await {
            tracing::warn!(error = %cleanup, "workspace rollback failed after identity save error");
        }
        return errors::domain_error_to_response(e);
    }

    let tokens = match issue_pair(&services, &identity.email) {
        Ok(tokens) => tokens,
        Err(res) => return res,
    };

    tracing::info!(identity = %identity.id, "registered new identity");
    envelope(
        StatusCode::CREATED,
        json!({ "user": IdentityDto::from(&identity), "tokens": tokens }),
        "User created successfully",
    )
}

/// POST /auth/login - form-encoded username/password.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Form(form): Form<LoginForm>,
) -> axum::response::Response {
    let email = form.username.trim().to_lowercase();

    let identity = match services.identities.get_by_email(&email).await {
        Ok(identity) => identity,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // Same rejection for unknown email and wrong password; no token is
    // issued and the revocation ledger is never consulted on this path.
    let Some(identity) = identity else {
        return errors::unauthorized("Incorrect email or password");
    };
    match services.hasher.verify(&form.password, &identity.password_hash) {
        Ok(true) => {}
        Ok(false) => return errors::unauthorized("Incorrect email or password"),
        Err(e) => {
            tracing::error!(error = %e, "password verification failed");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Login failed.");
        }
    }
    if !identity.is_active {
        return errors::unauthorized("Incorrect email or password");
    }

    let tokens = match issue_pair(&services, &identity.email) {
        Ok(tokens) => tokens,
        Err(res) => return res,
    };

    envelope(
        StatusCode::OK,
        json!({ "user": IdentityDto::from(&identity), "tokens": tokens }),
        "Login successful",
    )
}

/// GET /auth/refresh?refresh_token=... - mint a fresh access token.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<RefreshQuery>,
) -> axum::response::Response {
    let claims = match services.signer.verify(&query.refresh_token) {
        Ok(claims) => claims,
        Err(_) => return errors::unauthorized(CREDENTIALS_MESSAGE),
    };

    let access_token = match services.signer.issue(&claims.sub, TokenKind::Access, None) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "token issuance failed");
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not issue tokens.");
        }
    };

    envelope(
        StatusCode::OK,
        json!({ "access_token": access_token }),
        "Token refreshed successfully",
    )
}

/// POST /auth/logout - revoke the presented credential.
///
/// The entry's retention is bounded by the token's own expiry: once that
/// instant passes the verifier rejects it anyway, and the purge task may
/// drop the entry.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let (_, token, exp) = match current_identity(&services, &headers).await {
        Ok(auth) => auth,
        Err(res) => return res,
    };

    let expires_at = DateTime::<Utc>::from_timestamp(exp, 0).unwrap_or_else(Utc::now);
    services.revocations.record(&token, expires_at);

    envelope(StatusCode::OK, json!({}), "Logged out.")
}
