use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use gatekit_api::app::{build_app, AppServices};
use gatekit_auth::{Argon2PasswordHasher, AuthConfig, Identity, RevocationStore, Tenant, TokenSigner};
use gatekit_core::{DomainError, IdentityId, TenantId};
use gatekit_infra::{
    IdentityRepository, InMemoryIdentityRepository, InMemoryTenantRepository, TenantRepository,
};
use gatekit_policy::{
    Action, AuthorizationGateway, Decision, PolicyClient, PolicyError, StaticPolicyClient,
};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(policy: Arc<dyn PolicyClient>) -> Self {
        Self::spawn_with(
            policy,
            Arc::new(InMemoryIdentityRepository::new()),
            Arc::new(InMemoryTenantRepository::new()),
        )
        .await
    }

    async fn spawn_with(
        policy: Arc<dyn PolicyClient>,
        identities: Arc<dyn IdentityRepository>,
        tenants: Arc<dyn TenantRepository>,
    ) -> Self {
        let config = AuthConfig {
            secret_key: "test-secret".to_string(),
            ..AuthConfig::default()
        };
        let services = Arc::new(AppServices {
            signer: TokenSigner::new(&config).unwrap(),
            revocations: Arc::new(RevocationStore::new()),
            hasher: Arc::new(Argon2PasswordHasher),
            identities,
            tenants,
            gateway: AuthorizationGateway::new(policy),
        });

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn register(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
) -> (StatusCode, serde_json::Value) {
    let res = client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({ "email": email, "password": "hunter2hunter2", "role": "editor" }))
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn register_returns_tokens_and_identity() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();

    let (status, body) = register(&client, &srv.base_url, "alice@example.com").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
    assert_eq!(body["data"]["user"]["role"], "editor");
    assert!(body["data"]["tokens"]["access_token"].is_string());
    assert!(body["data"]["tokens"]["refresh_token"].is_string());

    // Single initial workspace, which is also the active one.
    let memberships = body["data"]["user"]["memberships"].as_array().unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(body["data"]["user"]["active_tenant"], memberships[0]);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "alice@example.com").await;
    let (status, body) = register(&client, &srv.base_url, "alice@example.com").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists.");
}

#[tokio::test]
async fn login_and_me_round_trip() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();
    register(&client, &srv.base_url, "alice@example.com").await;

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .form(&[("username", "alice@example.com"), ("password", "hunter2hunter2")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let token = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/me", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn wrong_password_gets_the_bearer_challenge_and_no_tokens() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();
    register(&client, &srv.base_url, "alice@example.com").await;

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .form(&[("username", "alice@example.com"), ("password", "wrong")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["data"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn logout_revokes_the_token_for_subsequent_requests() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();
    let (_, body) = register(&client, &srv.base_url, "alice@example.com").await;
    let token = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();

    // Works before logout.
    let res = client
        .get(format!("{}/me", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/auth/logout", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The gate rejects the revoked token even though it would still verify.
    let res = client
        .get(format!("{}/me", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Token is revoked.");
    assert_eq!(body["status_code"], 401);
    assert!(body["data"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_mints_a_usable_access_token() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();
    let (_, body) = register(&client, &srv.base_url, "alice@example.com").await;
    let refresh_token = body["data"]["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/auth/refresh", srv.base_url))
        .query(&[("refresh_token", refresh_token)])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let access_token = body["data"]["access_token"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/me", srv.base_url))
        .bearer_auth(access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_with_garbage_token_is_rejected() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/auth/refresh", srv.base_url))
        .query(&[("refresh_token", "garbage")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Could not validate credentials");
    assert!(body["data"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn membership_and_workspace_switch_flow() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();

    let (_, alice) = register(&client, &srv.base_url, "alice@example.com").await;
    let (_, bob) = register(&client, &srv.base_url, "bob@example.com").await;

    let alice_token = alice["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let bob_token = bob["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let alice_ws = alice["data"]["user"]["active_tenant"].as_str().unwrap().to_string();
    let bob_ws = bob["data"]["user"]["active_tenant"].as_str().unwrap().to_string();
    let bob_id = bob["data"]["user"]["id"].as_str().unwrap().to_string();

    // Bob cannot switch to a workspace he is not a member of.
    let res = client
        .post(format!("{}/workspaces/switch", srv.base_url))
        .bearer_auth(&bob_token)
        .json(&json!({ "tenant_id": alice_ws }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Alice adds Bob to her workspace; switching then succeeds.
    let res = client
        .post(format!("{}/workspaces/{}/members", srv.base_url, alice_ws))
        .bearer_auth(&alice_token)
        .json(&json!({ "identity_id": bob_id, "role": "viewer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/workspaces/switch", srv.base_url))
        .bearer_auth(&bob_token)
        .json(&json!({ "tenant_id": alice_ws }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["active_tenant"], alice_ws.as_str());

    // Removing Bob from the active workspace falls back to his original one.
    let res = client
        .delete(format!(
            "{}/workspaces/{}/members/{}",
            srv.base_url, alice_ws, bob_id
        ))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/me", srv.base_url))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["active_tenant"], bob_ws.as_str());

    // The sole remaining membership cannot be removed.
    let res = client
        .delete(format!(
            "{}/workspaces/{}/members/{}",
            srv.base_url, bob_ws, bob_id
        ))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn policy_outage_blocks_membership_changes_with_503() {
    // Allow registration to go through, then take the engine down.
    struct FlakyPolicy {
        inner: StaticPolicyClient,
        down: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl PolicyClient for FlakyPolicy {
        async fn check(
            &self,
            subject: IdentityId,
            action: Action,
            tenant: TenantId,
            resource_type: &str,
        ) -> Result<Decision, PolicyError> {
            if self.down.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(PolicyError::Unavailable("engine is down".to_string()));
            }
            self.inner.check(subject, action, tenant, resource_type).await
        }

        async fn provision_subject(
            &self,
            subject: IdentityId,
            tenant: TenantId,
            role: &str,
        ) -> Result<(), PolicyError> {
            self.inner.provision_subject(subject, tenant, role).await
        }

        async fn assign_role(
            &self,
            subject: IdentityId,
            tenant: TenantId,
            role: &str,
        ) -> Result<(), PolicyError> {
            self.inner.assign_role(subject, tenant, role).await
        }

        async fn create_tenant(
            &self,
            tenant: TenantId,
            name: &str,
            description: Option<&str>,
        ) -> Result<(), PolicyError> {
            self.inner.create_tenant(tenant, name, description).await
        }
    }

    let policy = Arc::new(FlakyPolicy {
        inner: StaticPolicyClient::allow_all(),
        down: std::sync::atomic::AtomicBool::new(false),
    });
    let srv = TestServer::spawn(policy.clone()).await;
    let client = reqwest::Client::new();

    let (_, alice) = register(&client, &srv.base_url, "alice@example.com").await;
    let (_, bob) = register(&client, &srv.base_url, "bob@example.com").await;
    let alice_token = alice["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let alice_ws = alice["data"]["user"]["active_tenant"].as_str().unwrap().to_string();
    let bob_id = bob["data"]["user"]["id"].as_str().unwrap().to_string();

    policy.down.store(true, std::sync::atomic::Ordering::SeqCst);

    let res = client
        .post(format!("{}/workspaces/{}/members", srv.base_url, alice_ws))
        .bearer_auth(&alice_token)
        .json(&json!({ "identity_id": bob_id, "role": "viewer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn pdp_conflict_during_provisioning_surfaces_as_409() {
    // A policy engine that already knows every subject.
    struct AlwaysConflicting;

    #[async_trait]
    impl PolicyClient for AlwaysConflicting {
        async fn check(
            &self,
            _: IdentityId,
            _: Action,
            _: TenantId,
            _: &str,
        ) -> Result<Decision, PolicyError> {
            Ok(Decision::Allow)
        }

        async fn provision_subject(
            &self,
            _: IdentityId,
            _: TenantId,
            _: &str,
        ) -> Result<(), PolicyError> {
            Err(PolicyError::Conflict)
        }

        async fn assign_role(
            &self,
            _: IdentityId,
            _: TenantId,
            _: &str,
        ) -> Result<(), PolicyError> {
            Ok(())
        }

        async fn create_tenant(
            &self,
            _: TenantId,
            _: &str,
            _: Option<&str>,
        ) -> Result<(), PolicyError> {
            Ok(())
        }
    }

    let srv = TestServer::spawn(Arc::new(AlwaysConflicting)).await;
    let client = reqwest::Client::new();

    let (status, body) = register(&client, &srv.base_url, "alice@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "A user with this key already exists.");
}

/// Delegates to the in-memory store but fails every read while `fail_reads`
/// is set, standing in for a storage outage mid-flight.
struct FlakyTenantRepository {
    inner: InMemoryTenantRepository,
    fail_reads: std::sync::atomic::AtomicBool,
}

impl FlakyTenantRepository {
    fn storage_offline(&self) -> bool {
        self.fail_reads.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantRepository for FlakyTenantRepository {
    async fn get(&self, id: TenantId) -> Result<Option<Tenant>, DomainError> {
        if self.storage_offline() {
            return Err(DomainError::invariant("tenant storage offline"));
        }
        self.inner.get(id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tenant>, DomainError> {
        if self.storage_offline() {
            return Err(DomainError::invariant("tenant storage offline"));
        }
        self.inner.get_by_name(name).await
    }

    async fn save(&self, tenant: Tenant) -> Result<(), DomainError> {
        self.inner.save(tenant).await
    }

    async fn delete(&self, id: TenantId) -> Result<(), DomainError> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn member_removal_aborts_when_tenant_storage_fails() {
    let tenants = Arc::new(FlakyTenantRepository {
        inner: InMemoryTenantRepository::new(),
        fail_reads: std::sync::atomic::AtomicBool::new(false),
    });
    let srv = TestServer::spawn_with(
        Arc::new(StaticPolicyClient::allow_all()),
        Arc::new(InMemoryIdentityRepository::new()),
        tenants.clone(),
    )
    .await;
    let client = reqwest::Client::new();

    let (_, alice) = register(&client, &srv.base_url, "alice@example.com").await;
    let (_, bob) = register(&client, &srv.base_url, "bob@example.com").await;
    let alice_token = alice["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let alice_ws = alice["data"]["user"]["active_tenant"].as_str().unwrap().to_string();
    let bob_token = bob["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let bob_id = bob["data"]["user"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/workspaces/{}/members", srv.base_url, alice_ws))
        .bearer_auth(&alice_token)
        .json(&json!({ "identity_id": bob_id, "role": "viewer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tenants.fail_reads.store(true, std::sync::atomic::Ordering::SeqCst);

    // The removal must report failure, not silently half-apply.
    let res = client
        .delete(format!(
            "{}/workspaces/{}/members/{}",
            srv.base_url, alice_ws, bob_id
        ))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Bob's memberships are untouched.
    let res = client
        .get(format!("{}/me", srv.base_url))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["memberships"].as_array().unwrap().len(), 2);
}

/// Delegates to the in-memory store but rejects every save while `fail_saves`
/// is set, standing in for the losing side of a duplicate-email race.
struct RacingIdentityRepository {
    inner: InMemoryIdentityRepository,
    fail_saves: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl IdentityRepository for RacingIdentityRepository {
    async fn get(&self, id: IdentityId) -> Result<Option<Identity>, DomainError> {
        self.inner.get(id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError> {
        self.inner.get_by_email(email).await
    }

    async fn save(&self, identity: Identity) -> Result<(), DomainError> {
        if self.fail_saves.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(DomainError::conflict(format!(
                "email already registered: {}",
                identity.email
            )));
        }
        self.inner.save(identity).await
    }

    async fn delete(&self, id: IdentityId) -> Result<(), DomainError> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn failed_registration_leaves_no_orphaned_workspace() {
    let identities = Arc::new(RacingIdentityRepository {
        inner: InMemoryIdentityRepository::new(),
        fail_saves: std::sync::atomic::AtomicBool::new(true),
    });
    let tenants = Arc::new(InMemoryTenantRepository::new());
    let srv = TestServer::spawn_with(
        Arc::new(StaticPolicyClient::allow_all()),
        identities,
        tenants.clone(),
    )
    .await;
    let client = reqwest::Client::new();

    let (status, _) = register(&client, &srv.base_url, "alice@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The workspace created for the failed registration was rolled back.
    assert_eq!(
        tenants
            .get_by_name("alice@example.com-workspace")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn requests_without_credentials_are_unauthorized() {
    let srv = TestServer::spawn(Arc::new(StaticPolicyClient::allow_all())).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/me", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");

    // Health stays open.
    let res = client.get(format!("{}/health", srv.base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
