//! Membership invariants over an [`Identity`] value.
//!
//! These are pure operations: persistence is an external collaborator, and
//! concurrent mutations of the same identity must be serialized (or detected
//! via optimistic concurrency) at that layer. Each operation either leaves
//! the identity in a state satisfying `active_tenant ∈ memberships` with a
//! non-empty membership set, or returns an error with the identity unchanged.

use chrono::{DateTime, Utc};
use thiserror::Error;

use gatekit_core::TenantId;

use crate::identity::Identity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MembershipError {
    #[error("identity is not a member of workspace {0}")]
    NotAMember(TenantId),

    /// Removing the sole remaining membership would leave the identity with
    /// no active workspace, which is rejected rather than silently allowed.
    #[error("cannot remove the last remaining workspace membership")]
    LastWorkspaceRemoval,
}

/// Add a workspace membership. No-op if already a member.
pub fn add_membership(identity: &mut Identity, tenant: TenantId, now: DateTime<Utc>) {
    if identity.is_member_of(tenant) {
        return;
    }
    identity.memberships.push(tenant);
    identity.updated_at = now;
}

/// Remove a workspace membership.
///
/// If the removed workspace was active, the active workspace is reassigned to
/// the first remaining membership (join order is stable). Removal of the sole
/// membership fails with [`MembershipError::LastWorkspaceRemoval`].
pub fn remove_membership(
    identity: &mut Identity,
    tenant: TenantId,
    now: DateTime<Utc>,
) -> Result<(), MembershipError> {
    if !identity.is_member_of(tenant) {
        return Err(MembershipError::NotAMember(tenant));
    }
    if identity.memberships.len() == 1 {
        return Err(MembershipError::LastWorkspaceRemoval);
    }

    identity.memberships.retain(|t| *t != tenant);
    if identity.active_tenant == tenant {
        // Membership set is non-empty here by the length check above.
        identity.active_tenant = identity.memberships[0];
    }
    identity.updated_at = now;
    Ok(())
}

/// Select the active workspace; must already be a member.
pub fn set_active_workspace(
    identity: &mut Identity,
    tenant: TenantId,
    now: DateTime<Utc>,
) -> Result<(), MembershipError> {
    if !identity.is_member_of(tenant) {
        return Err(MembershipError::NotAMember(tenant));
    }
    identity.active_tenant = tenant;
    identity.updated_at = now;
    Ok(())
}
