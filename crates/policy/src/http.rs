//! HTTP implementation of [`PolicyClient`].
//!
//! Speaks a small JSON API against the decision point: `POST /check` for
//! decisions, `POST /users/sync`, `POST /role_assignments` and
//! `POST /tenants` for provisioning. Every request carries the API key as a
//! bearer credential and a bounded timeout; transient failures (connect,
//! timeout, 5xx) are retried with bounded backoff. An explicit deny is a
//! successful response and is never retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use gatekit_core::{IdentityId, TenantId};

use crate::client::{Action, Decision, PolicyClient, PolicyError};

/// Environment variable names consumed by [`PolicyConfig::from_env`].
pub const ENV_POLICY_URL: &str = "GATEKIT_POLICY_URL";
pub const ENV_POLICY_API_KEY: &str = "GATEKIT_POLICY_API_KEY";
pub const ENV_POLICY_TIMEOUT_MS: &str = "GATEKIT_POLICY_TIMEOUT_MS";

const MAX_RETRIES: u32 = 2;
const BACKOFF_BASE_MS: u64 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Decision point endpoint configuration.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Base URL of the policy decision point.
    pub base_url: String,
    /// API key sent as a bearer credential.
    pub api_key: String,
    /// Per-request timeout (default: 3000ms).
    pub timeout: Duration,
}

impl PolicyConfig {
    pub fn from_env() -> Result<Self, PolicyConfigError> {
        let base_url = std::env::var(ENV_POLICY_URL)
            .map_err(|_| PolicyConfigError::MissingVar(ENV_POLICY_URL))?;
        let api_key = std::env::var(ENV_POLICY_API_KEY)
            .map_err(|_| PolicyConfigError::MissingVar(ENV_POLICY_API_KEY))?;

        let timeout_ms = match std::env::var(ENV_POLICY_TIMEOUT_MS) {
            Err(_) => 3000,
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| PolicyConfigError::InvalidVar {
                    var: ENV_POLICY_TIMEOUT_MS,
                    reason: e.to_string(),
                })?,
        };

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    allow: bool,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// [`PolicyClient`] over HTTP.
pub struct HttpPolicyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPolicyClient {
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PolicyError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    /// POST `body` to `path`, retrying transient failures.
    ///
    /// The request future is dropped if the caller is cancelled, which aborts
    /// the outstanding connection rather than leaking it.
    async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response, PolicyError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            let result = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            let retryable = match &result {
                Err(e) => e.is_timeout() || e.is_connect(),
                Ok(res) => res.status().is_server_error(),
            };

            if retryable && attempt < MAX_RETRIES {
                attempt += 1;
                tracing::debug!(url = %url, attempt, "retrying transient policy engine failure");
                tokio::time::sleep(Duration::from_millis(BACKOFF_BASE_MS << attempt)).await;
                continue;
            }

            return match result {
                Err(e) => Err(PolicyError::Unavailable(e.to_string())),
                Ok(res) if res.status().is_server_error() => {
                    Err(PolicyError::Unavailable(format!("status {}", res.status())))
                }
                Ok(res) => Ok(res),
            };
        }
    }

    async fn post_expecting_ok(&self, path: &str, body: serde_json::Value) -> Result<(), PolicyError> {
        let res = self.post(path, body).await?;
        let status = res.status();

        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 409 {
            return Err(PolicyError::Conflict);
        }

        let message = res
            .json::<ApiErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_default();
        Err(PolicyError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PolicyClient for HttpPolicyClient {
    async fn check(
        &self,
        subject: IdentityId,
        action: Action,
        tenant: TenantId,
        resource_type: &str,
    ) -> Result<Decision, PolicyError> {
        let body = json!({
            "user": subject.to_string(),
            "action": action.as_str(),
            "resource": { "type": resource_type, "tenant": tenant.to_string() },
        });

        let res = self.post("/check", body).await?;
        let status = res.status();
        if !status.is_success() {
            let message = res
                .json::<ApiErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_default();
            return Err(PolicyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let decision = res
            .json::<CheckResponse>()
            .await
            .map_err(|e| PolicyError::Unavailable(e.to_string()))?;

        Ok(if decision.allow {
            Decision::Allow
        } else {
            Decision::Deny
        })
    }

    async fn provision_subject(
        &self,
        subject: IdentityId,
        tenant: TenantId,
        role: &str,
    ) -> Result<(), PolicyError> {
        self.post_expecting_ok("/users/sync", json!({ "key": subject.to_string() }))
            .await?;
        self.assign_role(subject, tenant, role).await
    }

    async fn assign_role(
        &self,
        subject: IdentityId,
        tenant: TenantId,
        role: &str,
    ) -> Result<(), PolicyError> {
        self.post_expecting_ok(
            "/role_assignments",
            json!({
                "user": subject.to_string(),
                "role": role,
                "tenant": tenant.to_string(),
            }),
        )
        .await
    }

    async fn create_tenant(
        &self,
        tenant: TenantId,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), PolicyError> {
        self.post_expecting_ok(
            "/tenants",
            json!({
                "key": tenant.to_string(),
                "name": name,
                "description": description,
            }),
        )
        .await
    }
}
