//! `gatekit-infra` — persistence ports and their in-memory implementations.
//!
//! The domain crates never talk to storage directly; they go through the
//! repository traits here. The in-memory implementations are intended for
//! dev/test wiring (a relational backend slots in behind the same traits).

pub mod in_memory;
pub mod repository;

pub use in_memory::{InMemoryIdentityRepository, InMemoryTenantRepository};
pub use repository::{IdentityRepository, TenantRepository};
