//! `gatekit-auth` — credential issuance/verification, the revocation ledger,
//! and tenant-membership invariants.
//!
//! This crate is intentionally decoupled from HTTP and storage: tokens are
//! verified without any directory lookup, and membership rules are pure
//! functions over an [`Identity`] value. Persistence and routing live in
//! `gatekit-infra` / `gatekit-api`.

pub mod config;
pub mod directory;
pub mod identity;
pub mod password;
pub mod revocation;
pub mod token;

pub use config::{AuthConfig, ConfigError};
pub use directory::MembershipError;
pub use identity::{Identity, Role, Tenant};
pub use password::{Argon2PasswordHasher, PasswordError, PasswordHasher};
pub use revocation::{Clock, RevocationEntry, RevocationStore, SystemClock};
pub use token::{Claims, TokenError, TokenKind, TokenSigner};
