//! HTTP application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and the response envelope
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use gatekit_auth::{PasswordHasher, RevocationStore, TokenSigner};
use gatekit_infra::{IdentityRepository, TenantRepository};
use gatekit_policy::AuthorizationGateway;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Everything the handlers need, shared across requests.
pub struct AppServices {
    pub signer: TokenSigner,
    pub revocations: Arc<RevocationStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub identities: Arc<dyn IdentityRepository>,
    pub tenants: Arc<dyn TenantRepository>,
    pub gateway: AuthorizationGateway,
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let gate = middleware::GateState {
        revocations: services.revocations.clone(),
    };

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        // Outermost layer: the revocation gate sees every request first.
        .layer(axum::middleware::from_fn_with_state(
            gate,
            middleware::revocation_gate,
        ))
}
