//! Workspace membership and active-workspace endpoints.
//!
//! Membership mutations go through the pure directory operations, and every
//! mutation of someone else's membership is mediated by the policy engine
//! (`assign_role` action, fail closed).

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    routing::{delete, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use gatekit_auth::{directory, Role};
use gatekit_core::{IdentityId, TenantId};
use gatekit_policy::Action;

use crate::app::dto::{envelope, AddMemberRequest, IdentityDto, SwitchWorkspaceRequest};
use crate::app::routes::common::current_identity;
use crate::app::{errors, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/switch", post(switch_workspace))
        .route("/:id/members", post(add_member))
        .route("/:id/members/:identity_id", delete(remove_member))
}

/// POST /workspaces/switch - select the active workspace for the caller.
pub async fn switch_workspace(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(req): Json<SwitchWorkspaceRequest>,
) -> axum::response::Response {
    let (mut identity, _, _) = match current_identity(&services, &headers).await {
        Ok(auth) => auth,
        Err(res) => return res,
    };

    if let Err(e) = directory::set_active_workspace(&mut identity, req.tenant_id, Utc::now()) {
        return errors::membership_error_to_response(e);
    }
    if let Err(e) = services.identities.save(identity.clone()).await {
        return errors::domain_error_to_response(e);
    }

    envelope(StatusCode::OK, IdentityDto::from(&identity), "Workspace switched")
}

/// POST /workspaces/:id/members - add an identity to a workspace.
pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path(workspace_id): Path<TenantId>,
    Json(req): Json<AddMemberRequest>,
) -> axum::response::Response {
    let (actor, _, _) = match current_identity(&services, &headers).await {
        Ok(auth) => auth,
        Err(res) => return res,
    };

    let role = match req.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services
        .gateway
        .authorize(actor.id, Action::AssignRole, workspace_id, "member")
        .await
    {
        return errors::authz_error_to_response(e);
    }

    let mut tenant = match services.tenants.get(workspace_id).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "Workspace not found."),
        Err(e) => return errors::domain_error_to_response(e),
    };
    let mut target = match services.identities.get(req.identity_id).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "Identity not found."),
        Err(e) => return errors::domain_error_to_response(e),
    };

    let now = Utc::now();
    directory::add_membership(&mut target, workspace_id, now);
    if !tenant.members.contains(&target.id) {
        tenant.members.push(target.id);
        tenant.updated_at = now;
    }

    if let Err(e) = services
        .gateway
        .assign_role(target.id, workspace_id, role.as_str())
        .await
    {
        return errors::provisioning_error_to_response(e);
    }

    if let Err(e) = services.identities.save(target.clone()).await {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.tenants.save(tenant).await {
        return errors::domain_error_to_response(e);
    }

    envelope(StatusCode::OK, IdentityDto::from(&target), "Member added")
}

/// DELETE /workspaces/:id/members/:identity_id - remove a membership.
pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Path((workspace_id, identity_id)): Path<(TenantId, IdentityId)>,
) -> axum::response::Response {
    let (actor, _, _) = match current_identity(&services, &headers).await {
        Ok(auth) => auth,
        Err(res) => return res,
    };

    if let Err(e) = services
        .gateway
        .authorize(actor.id, Action::AssignRole, workspace_id, "member")
        .await
    {
        return errors::authz_error_to_response(e);
    }

    let mut target = match services.identities.get(identity_id).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "Identity not found."),
        Err(e) => return errors::domain_error_to_response(e),
    };

    let now = Utc::now();
    if let Err(e) = directory::remove_membership(&mut target, workspace_id, now) {
        return errors::membership_error_to_response(e);
    }

    // A storage failure here must abort before the identity is saved, or the
    // identity and tenant records diverge while the caller sees a success.
    match services.tenants.get(workspace_id).await {
        Ok(Some(mut tenant)) => {
            tenant.members.retain(|m| *m != target.id);
            tenant.updated_at = now;
            if let Err(e) = services.tenants.save(tenant).await {
                return errors::domain_error_to_response(e);
            }
        }
        Ok(None) => {}
        Err(e) => return errors::domain_error_to_response(e),
    }

    if let Err(e) = services.identities.save(target.clone()).await {
        return errors::domain_error_to_response(e);
    }

    envelope(StatusCode::OK, json!({}), "Member removed")
}
