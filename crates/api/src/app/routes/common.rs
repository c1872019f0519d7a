//! Shared handler plumbing: bearer authentication against the directory.

use std::sync::Arc;

use axum::http::HeaderMap;

use gatekit_auth::Identity;

use crate::app::{errors, AppServices};
use crate::middleware::extract_bearer;

pub const CREDENTIALS_MESSAGE: &str = "Could not validate credentials";

/// Verify the request's bearer credential and load the identity behind it.
///
/// Returns the identity together with the raw token (logout needs the
/// literal token string for the revocation ledger). The revocation gate has
/// already rejected revoked tokens by the time this runs.
pub async fn current_identity(
    services: &Arc<AppServices>,
    headers: &HeaderMap,
) -> Result<(Identity, String, i64), axum::response::Response> {
    let token = extract_bearer(headers).ok_or_else(|| errors::unauthorized(CREDENTIALS_MESSAGE))?;

    let claims = services
        .signer
        .verify(token)
        .map_err(|_| errors::unauthorized(CREDENTIALS_MESSAGE))?;

    let identity = services
        .identities
        .get_by_email(&claims.sub)
        .await
        .map_err(errors::domain_error_to_response)?
        .ok_or_else(|| errors::unauthorized(CREDENTIALS_MESSAGE))?;

    if !identity.is_active {
        return Err(errors::unauthorized(CREDENTIALS_MESSAGE));
    }

    Ok((identity, token.to_string(), claims.exp))
}
