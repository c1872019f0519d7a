//! Identity and tenant domain model.
//!
//! # Invariants
//! - `active_tenant ∈ memberships` at all times.
//! - `memberships` is never empty for a persisted identity (registration
//!   assigns exactly one initial tenant, and removal of the sole remaining
//!   membership is rejected; see [`crate::directory`]).

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatekit_core::{DomainError, IdentityId, TenantId};

/// Role granted to an identity within its tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Editor,
    #[default]
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// An authenticated actor and its workspace memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Workspaces this identity belongs to, in join order.
    pub memberships: Vec<TenantId>,
    /// The workspace currently selected for this identity's actions.
    pub active_tenant: TenantId,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Create a new identity joined to exactly one initial workspace.
    ///
    /// The email is normalized (trimmed, lowercased) and minimally validated;
    /// hashing the password happens before this call.
    pub fn register(
        email: &str,
        password_hash: String,
        role: Role,
        initial_tenant: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        Ok(Self {
            id: IdentityId::new(),
            email,
            password_hash,
            memberships: vec![initial_tenant],
            active_tenant: initial_tenant,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_member_of(&self, tenant: TenantId) -> bool {
        self.memberships.contains(&tenant)
    }
}

/// An isolated organizational namespace ("workspace").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<IdentityId>,
    pub members: Vec<IdentityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn create(
        name: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("tenant name cannot be empty"));
        }

        Ok(Self {
            id: TenantId::new(),
            name: name.to_string(),
            description,
            owner: None,
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Assign the owner (set post-creation, once the first identity exists).
    pub fn assign_owner(&mut self, owner: IdentityId, now: DateTime<Utc>) {
        self.owner = Some(owner);
        if !self.members.contains(&owner) {
            self.members.push(owner);
        }
        self.updated_at = now;
    }
}
