//! In-memory repository implementations.
//!
//! Intended for tests/dev. Not optimized for performance.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use gatekit_auth::{Identity, Tenant};
use gatekit_core::{DomainError, IdentityId, TenantId};

use crate::repository::{IdentityRepository, TenantRepository};

#[derive(Debug, Default)]
pub struct InMemoryIdentityRepository {
    records: RwLock<HashMap<IdentityId, Identity>>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn get(&self, id: IdentityId) -> Result<Option<Identity>, DomainError> {
        let records = lock_read(&self.records)?;
        Ok(records.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError> {
        let records = lock_read(&self.records)?;
        Ok(records.values().find(|i| i.email == email).cloned())
    }

    async fn save(&self, identity: Identity) -> Result<(), DomainError> {
        let mut records = lock_write(&self.records)?;

        // Email must stay unique across identities.
        if records
            .values()
            .any(|i| i.email == identity.email && i.id != identity.id)
        {
            return Err(DomainError::conflict(format!(
                "email already registered: {}",
                identity.email
            )));
        }

        records.insert(identity.id, identity);
        Ok(())
    }

    async fn delete(&self, id: IdentityId) -> Result<(), DomainError> {
        let mut records = lock_write(&self.records)?;
        records.remove(&id).map(|_| ()).ok_or(DomainError::NotFound)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTenantRepository {
    records: RwLock<HashMap<TenantId, Tenant>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn get(&self, id: TenantId) -> Result<Option<Tenant>, DomainError> {
        let records = lock_read(&self.records)?;
        Ok(records.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tenant>, DomainError> {
        let records = lock_read(&self.records)?;
        Ok(records.values().find(|t| t.name == name).cloned())
    }

    async fn save(&self, tenant: Tenant) -> Result<(), DomainError> {
        let mut records = lock_write(&self.records)?;

        if records
            .values()
            .any(|t| t.name == tenant.name && t.id != tenant.id)
        {
            return Err(DomainError::conflict(format!(
                "tenant name already taken: {}",
                tenant.name
            )));
        }

        records.insert(tenant.id, tenant);
        Ok(())
    }

    async fn delete(&self, id: TenantId) -> Result<(), DomainError> {
        let mut records = lock_write(&self.records)?;
        records.remove(&id).map(|_| ()).ok_or(DomainError::NotFound)
    }
}

fn lock_read<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockReadGuard<'_, T>, DomainError> {
    lock.read()
        .map_err(|_| DomainError::invariant("repository lock poisoned"))
}

fn lock_write<T>(lock: &RwLock<T>) -> Result<std::sync::RwLockWriteGuard<'_, T>, DomainError> {
    lock.write()
        .map_err(|_| DomainError::invariant("repository lock poisoned"))
}
