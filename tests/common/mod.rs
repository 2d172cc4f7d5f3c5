#![allow(dead_code)]

use axum::body::Body;
use http::{Method, Request};
use sqlx::SqlitePool;
use std::sync::Arc;
use tenantgate::db;
use tenantgate::guard::AdminGuard;
use tenantgate::models::invite::InvitePolicy;
use tenantgate::models::role::RoleName;
use tenantgate::models::service::CreateService;
use tenantgate::models::user::{CreateUser, User};
use tenantgate::notify::Notifier;
use tenantgate::routes;
use tenantgate::state::AppState;

pub const INVITE_BASE_URL: &str = "https://selfservice.example.com/invites";

/// Test server that owns an in-memory SQLite pool and full AppState.
/// Each instance is isolated, so tests can run in parallel.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_policy(InvitePolicy::default(), AdminGuard::default()).await
    }

    pub async fn with_policy(invite_policy: InvitePolicy, admin_guard: AdminGuard) -> Self {
        let pool = db::create_pool("sqlite::memory:")
            .await
            .expect("failed to create test pool");

        let state = AppState {
            db: pool,
            notifier: Notifier::Log,
            invite_policy,
            admin_guard,
            invite_base_url: Arc::from(INVITE_BASE_URL),
        };

        Self { state }
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    pub async fn create_user(&self, email: &str) -> User {
        let mut conn = self.pool().acquire().await.unwrap();
        db::users::create_user(
            &mut conn,
            &CreateUser {
                email: email.to_string(),
                telephone_number: None,
            },
        )
        .await
        .expect("failed to create test user")
    }

    /// Create a service and return its id.
    pub async fn create_service(&self, gateway_account_ids: &[&str]) -> String {
        db::services::create_service(
            self.pool(),
            &CreateService {
                name: Some("Test service".to_string()),
                service_names: Default::default(),
                gateway_account_ids: gateway_account_ids.iter().map(|id| id.to_string()).collect(),
                custom_branding: None,
            },
        )
        .await
        .expect("failed to create test service")
        .id
    }

    pub async fn assign_role(&self, user_id: &str, service_id: &str, role: RoleName) {
        let mut conn = self.pool().acquire().await.unwrap();
        db::members::insert_membership(&mut conn, user_id, service_id, role)
            .await
            .expect("failed to assign role");
    }

    /// Create a user with the given role on the service and return the user id.
    pub async fn create_member(&self, email: &str, service_id: &str, role: RoleName) -> String {
        let user = self.create_user(email).await;
        self.assign_role(&user.id, service_id, role).await;
        user.id
    }

    pub async fn admin_count(&self, service_id: &str) -> i64 {
        db::members::count_admins(self.pool(), service_id)
            .await
            .unwrap()
    }
}

// ---------------------------------------------------------------------------
// Request builder helpers
// ---------------------------------------------------------------------------

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The code is the last path segment of an invite link.
pub fn code_from_link(link: &str) -> String {
    link.rsplit('/').next().unwrap().to_string()
}

pub async fn test_app() -> axum::Router {
    let server = TestServer::new().await;
    routes::router(server.state)
}
