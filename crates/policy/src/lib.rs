//! `gatekit-policy` — delegated authorization.
//!
//! Permission decisions are not computed locally: every check is forwarded to
//! an external policy decision point, and the gateway fails closed when that
//! service cannot answer. The client sits behind a trait so tests substitute
//! a deterministic fake without network access.

pub mod client;
pub mod gateway;
pub mod http;

pub use client::{Action, Decision, PolicyClient, PolicyError, StaticPolicyClient};
pub use gateway::{AuthorizationGateway, AuthzError};
pub use http::{HttpPolicyClient, PolicyConfig};
