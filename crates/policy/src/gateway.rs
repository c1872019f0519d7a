//! Fail-closed authorization boundary over a [`PolicyClient`].

use std::sync::Arc;

use thiserror::Error;

use gatekit_core::{IdentityId, TenantId};

use crate::client::{Action, Decision, PolicyClient, PolicyError};

/// Why an action was blocked.
///
/// `PolicyEngineUnavailable` also blocks the action (fail closed) but stays
/// distinguishable from an explicit deny so outages are diagnosable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("permission denied")]
    Denied,

    #[error("policy engine unavailable: {0}")]
    PolicyEngineUnavailable(String),
}

/// Mediates every protected action through the external decision point.
#[derive(Clone)]
pub struct AuthorizationGateway {
    client: Arc<dyn PolicyClient>,
}

impl AuthorizationGateway {
    pub fn new(client: Arc<dyn PolicyClient>) -> Self {
        Self { client }
    }

    /// Check a permission; `Ok(())` only on an explicit allow.
    ///
    /// Any failure to obtain a decision blocks the action. Explicit denies
    /// are logged at debug, outages at warn, so the two are separable in
    /// operational tooling.
    pub async fn authorize(
        &self,
        subject: IdentityId,
        action: Action,
        tenant: TenantId,
        resource_type: &str,
    ) -> Result<(), AuthzError> {
        match self.client.check(subject, action, tenant, resource_type).await {
            Ok(Decision::Allow) => Ok(()),
            Ok(Decision::Deny) => {
                tracing::debug!(%subject, %action, %tenant, resource_type, "policy engine denied action");
                Err(AuthzError::Denied)
            }
            Err(PolicyError::Unavailable(reason)) => {
                tracing::warn!(%subject, %action, %tenant, %reason, "policy engine unavailable; failing closed");
                Err(AuthzError::PolicyEngineUnavailable(reason))
            }
            Err(e) => {
                tracing::warn!(%subject, %action, %tenant, error = %e, "policy check failed; failing closed");
                Err(AuthzError::PolicyEngineUnavailable(e.to_string()))
            }
        }
    }

    /// Register a new subject and its initial role at registration time.
    ///
    /// [`PolicyError::Conflict`] propagates unchanged so the caller can
    /// surface "already exists" distinctly.
    pub async fn provision_subject(
        &self,
        subject: IdentityId,
        tenant: TenantId,
        role: &str,
    ) -> Result<(), PolicyError> {
        self.client.provision_subject(subject, tenant, role).await
    }

    pub async fn assign_role(
        &self,
        subject: IdentityId,
        tenant: TenantId,
        role: &str,
    ) -> Result<(), PolicyError> {
        self.client.assign_role(subject, tenant, role).await
    }

    pub async fn create_tenant(
        &self,
        tenant: TenantId,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), PolicyError> {
        self.client.create_tenant(tenant, name, description).await
    }
}
