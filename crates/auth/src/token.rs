//! Signed bearer-credential issuance and verification.
//!
//! Tokens are self-contained: they carry the subject claim and an absolute
//! expiry, and verification needs only the shared secret, not a directory
//! lookup. Whether the subject still exists is the caller's concern.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AuthConfig, ConfigError};

/// Credential kind: short-lived access vs. long-lived refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Verified claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier (the identity's email in this service).
    pub sub: String,
    /// Absolute expiry, seconds since epoch.
    pub exp: i64,
}

/// Wire-level claims as decoded; `sub` may be absent on a tampered or
/// foreign token and is checked explicitly so the failure is distinguishable.
#[derive(Debug, Deserialize, Serialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token is not structurally a signed token.
    #[error("malformed token")]
    Malformed,

    /// The signature does not match (tampered or wrong secret).
    #[error("invalid token signature")]
    SignatureInvalid,

    /// The encoded expiry is in the past.
    #[error("token has expired")]
    Expired,

    /// The subject claim is absent or empty.
    #[error("token is missing the subject claim")]
    MissingSubject,

    /// Encoding failed (effectively unreachable with a valid config).
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Issues and verifies signed bearer credentials.
///
/// Holds only read-only configuration (keys, algorithm, TTL defaults), so a
/// single instance is safe to share across concurrent requests.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

// Manual impl: the key material must never end up in logs or test output.
impl core::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Build a signer from configuration.
    ///
    /// Fails if the secret is empty or the algorithm is not one of the
    /// supported HMAC variants.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        if config.secret_key.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        let algorithm = match config.algorithm.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => return Err(ConfigError::UnsupportedAlgorithm(other.to_string())),
        };

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            algorithm,
            access_ttl: Duration::minutes(config.access_token_expire_minutes),
            refresh_ttl: Duration::days(config.refresh_token_expire_days),
        })
    }

    /// Default lifetime for the given kind.
    pub fn default_ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a signed token for `sub`.
    ///
    /// Expiry is `now + ttl_override` when given, otherwise the kind-specific
    /// default. Pure function of input + clock + configuration.
    pub fn issue(
        &self,
        sub: &str,
        kind: TokenKind,
        ttl_override: Option<Duration>,
    ) -> Result<String, TokenError> {
        let ttl = ttl_override.unwrap_or_else(|| self.default_ttl(kind));
        let exp = (Utc::now() + ttl).timestamp();

        let claims = RawClaims {
            sub: Some(sub.to_string()),
            exp,
        };

        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry; return the claims on success.
    ///
    /// Performs no directory lookup: a token for a since-deleted subject
    /// still verifies until it expires or is revoked.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // No leeway: a token with ttl 0 is expired immediately after issue.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = jsonwebtoken::decode::<RawClaims>(token, &self.decoding_key, &validation)
            .map_err(map_decode_error)?;

        match data.claims.sub {
            Some(sub) if !sub.is_empty() => Ok(Claims {
                sub,
                exp: data.claims.exp,
            }),
            _ => Err(TokenError::MissingSubject),
        }
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
        _ => TokenError::Malformed,
    }
}
