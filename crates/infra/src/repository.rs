//! Persistence ports for identity and tenant records.

use async_trait::async_trait;

use gatekit_auth::{Identity, Tenant};
use gatekit_core::{DomainError, IdentityId, TenantId};

/// Storage port for [`Identity`] records.
///
/// `save` is an upsert keyed by id. Implementations must enforce email
/// uniqueness (`DomainError::Conflict`) and apply each save atomically;
/// membership invariants are not safely checkable under lost-update races,
/// so concurrent writers to the same identity need serialization or
/// optimistic-concurrency detection here.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn get(&self, id: IdentityId) -> Result<Option<Identity>, DomainError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError>;
    async fn save(&self, identity: Identity) -> Result<(), DomainError>;
    async fn delete(&self, id: IdentityId) -> Result<(), DomainError>;
}

/// Storage port for [`Tenant`] records; name uniqueness enforced on save.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn get(&self, id: TenantId) -> Result<Option<Tenant>, DomainError>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Tenant>, DomainError>;
    async fn save(&self, tenant: Tenant) -> Result<(), DomainError>;
    async fn delete(&self, id: TenantId) -> Result<(), DomainError>;
}
