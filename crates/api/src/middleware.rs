//! Revocation gate: runs once per inbound request, before any handler.
//!
//! The gate only consults the revocation ledger; signature and expiry stay
//! the handler's responsibility. That keeps the per-request cost of the gate
//! to a map lookup, and a deliberately invalidated credential is rejected
//! before any verification work happens.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use gatekit_auth::RevocationStore;

use crate::app::errors;

#[derive(Clone)]
pub struct GateState {
    pub revocations: Arc<RevocationStore>,
}

pub async fn revocation_gate(
    State(state): State<GateState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(token) = extract_bearer(req.headers()) {
        if state.revocations.contains(token) {
            return errors::json_error(StatusCode::UNAUTHORIZED, "Token is revoked.");
        }
    }

    // No bearer, or not revoked: forward unchanged. Handlers that require
    // authentication enforce it themselves.
    next.run(req).await
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() { None } else { Some(token) }
}
