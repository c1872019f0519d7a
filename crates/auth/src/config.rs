//! Authentication configuration (environment-driven).

use thiserror::Error;

/// Environment variable names consumed by [`AuthConfig::from_env`].
pub const ENV_SECRET_KEY: &str = "GATEKIT_SECRET_KEY";
pub const ENV_ALGORITHM: &str = "GATEKIT_ALGORITHM";
pub const ENV_ACCESS_TTL_MINUTES: &str = "GATEKIT_ACCESS_TOKEN_EXPIRE_MINUTES";
pub const ENV_REFRESH_TTL_DAYS: &str = "GATEKIT_REFRESH_TOKEN_EXPIRE_DAYS";

/// Configuration for credential issuance/verification.
///
/// The algorithm is kept as a plain string here; [`crate::TokenSigner::new`]
/// parses and rejects unsupported values so that a bad algorithm is fatal at
/// startup rather than per-request.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret for HMAC signing.
    pub secret_key: String,
    /// Signing algorithm name (HS256, HS384 or HS512).
    pub algorithm: String,
    /// Access-token lifetime in minutes (default: 30).
    pub access_token_expire_minutes: i64,
    /// Refresh-token lifetime in days (default: 7).
    pub refresh_token_expire_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("signing secret is empty")]
    EmptySecret,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl AuthConfig {
    /// Load configuration from the environment.
    ///
    /// The secret is required; everything else has a default. Errors here are
    /// fatal at startup; there is no per-request recovery from a missing
    /// signing secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key =
            std::env::var(ENV_SECRET_KEY).map_err(|_| ConfigError::MissingVar(ENV_SECRET_KEY))?;
        if secret_key.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        let algorithm =
            std::env::var(ENV_ALGORITHM).unwrap_or_else(|_| "HS256".to_string());

        let access_token_expire_minutes =
            parse_var(ENV_ACCESS_TTL_MINUTES, 30)?;
        let refresh_token_expire_days =
            parse_var(ENV_REFRESH_TTL_DAYS, 7)?;

        Ok(Self {
            secret_key,
            algorithm,
            access_token_expire_minutes,
            refresh_token_expire_days,
        })
    }
}

fn parse_var(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse::<i64>().map_err(|e| ConfigError::InvalidVar {
            var,
            reason: e.to_string(),
        }),
    }
}
