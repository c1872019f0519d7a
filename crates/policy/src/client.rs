//! Policy decision point client contract.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatekit_core::{IdentityId, TenantId};

/// Action being authorized. Closed set; authorization branches match
/// exhaustively on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Publish,
    AssignRole,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Publish => "publish",
            Action::AssignRole => "assign_role",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The decision point could not answer (timeout, connect failure, 5xx).
    /// Callers must treat this as deny.
    #[error("policy engine unavailable: {0}")]
    Unavailable(String),

    /// The subject (or tenant) already exists at the decision point.
    #[error("already exists at the policy engine")]
    Conflict,

    /// Any other decision-point API failure.
    #[error("policy engine error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Network client for the external policy decision point.
///
/// `check` is side-effect-free and idempotent; the provisioning operations
/// mutate PDP state and surface [`PolicyError::Conflict`] on duplicates.
#[async_trait]
pub trait PolicyClient: Send + Sync {
    /// Ask whether `subject` may perform `action` on `resource_type` within
    /// `tenant`.
    async fn check(
        &self,
        subject: IdentityId,
        action: Action,
        tenant: TenantId,
        resource_type: &str,
    ) -> Result<Decision, PolicyError>;

    /// Register a new subject and its initial role assignment.
    async fn provision_subject(
        &self,
        subject: IdentityId,
        tenant: TenantId,
        role: &str,
    ) -> Result<(), PolicyError>;

    /// Assign a role to an existing subject within a tenant.
    async fn assign_role(
        &self,
        subject: IdentityId,
        tenant: TenantId,
        role: &str,
    ) -> Result<(), PolicyError>;

    /// Register a tenant with the decision point.
    async fn create_tenant(
        &self,
        tenant: TenantId,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), PolicyError>;
}

/// Scripted in-memory client for dev/test: allows everything unless told
/// otherwise, and remembers provisioned subjects so duplicate provisioning
/// conflicts like the real PDP.
#[derive(Debug, Default)]
pub struct StaticPolicyClient {
    deny_all: bool,
    unavailable: bool,
    provisioned: RwLock<HashSet<IdentityId>>,
}

impl StaticPolicyClient {
    /// Allows every check.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Denies every check (explicit deny, no error).
    pub fn deny_all() -> Self {
        Self {
            deny_all: true,
            ..Self::default()
        }
    }

    /// Simulates an unreachable decision point.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    fn ensure_reachable(&self) -> Result<(), PolicyError> {
        if self.unavailable {
            return Err(PolicyError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyClient for StaticPolicyClient {
    async fn check(
        &self,
        _subject: IdentityId,
        _action: Action,
        _tenant: TenantId,
        _resource_type: &str,
    ) -> Result<Decision, PolicyError> {
        self.ensure_reachable()?;
        if self.deny_all {
            Ok(Decision::Deny)
        } else {
            Ok(Decision::Allow)
        }
    }

    async fn provision_subject(
        &self,
        subject: IdentityId,
        _tenant: TenantId,
        _role: &str,
    ) -> Result<(), PolicyError> {
        self.ensure_reachable()?;
        let mut provisioned = self.provisioned.write().unwrap_or_else(|e| e.into_inner());
        if !provisioned.insert(subject) {
            return Err(PolicyError::Conflict);
        }
        Ok(())
    }

    async fn assign_role(
        &self,
        _subject: IdentityId,
        _tenant: TenantId,
        _role: &str,
    ) -> Result<(), PolicyError> {
        self.ensure_reachable()
    }

    async fn create_tenant(
        &self,
        _tenant: TenantId,
        _name: &str,
        _description: Option<&str>,
    ) -> Result<(), PolicyError> {
        self.ensure_reachable()
    }
}
