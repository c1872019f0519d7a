use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use gatekit_api::app::{build_app, AppServices};
use gatekit_auth::{Argon2PasswordHasher, AuthConfig, RevocationStore, TokenSigner};
use gatekit_infra::{InMemoryIdentityRepository, InMemoryTenantRepository};
use gatekit_policy::{AuthorizationGateway, HttpPolicyClient, PolicyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatekit_observability::init();

    // Configuration errors are fatal at startup; there is no per-request
    // recovery from a missing signing secret or policy endpoint.
    let auth_config = AuthConfig::from_env().context("auth configuration")?;
    let signer = TokenSigner::new(&auth_config).context("token signer")?;

    let policy_config = PolicyConfig::from_env().context("policy engine configuration")?;
    let policy = HttpPolicyClient::new(policy_config).context("policy engine client")?;

    let revocations = Arc::new(RevocationStore::new());
    let services = Arc::new(AppServices {
        signer,
        revocations: revocations.clone(),
        hasher: Arc::new(Argon2PasswordHasher),
        identities: Arc::new(InMemoryIdentityRepository::new()),
        tenants: Arc::new(InMemoryTenantRepository::new()),
        gateway: AuthorizationGateway::new(Arc::new(policy)),
    });

    // Periodically drop revocation entries whose credentials have expired.
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3600));
        loop {
            ticker.tick().await;
            let purged = revocations.purge_expired();
            if purged > 0 {
                tracing::info!(purged, "purged expired revocation entries");
            }
        }
    });

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .context("failed to bind 0.0.0.0:8080")?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
