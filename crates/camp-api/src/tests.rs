//! Router tests
//!
//! The pool connects lazily and users come from memory, so only paths that
//! stop before the database are exercised here: authentication, role
//! checks, payload rejections and the in-memory kiosk registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use tower::ServiceExt;

use camp_auth::{Authenticator, CurrentUser, MemorySessionStore, UserLookup};
use camp_core::config::AppConfig;
use camp_core::{CampError, Id};
use camp_db::Database;
use camp_models::{Role, User};
use camp_notifications::{Mailer, MemoryEmailSender};
use camp_services::{ManualGateway, ServiceContext, ServiceSettings};
use camp_storage::MemoryStorage;

use crate::extractors::AppState;
use crate::routes::router;

struct FixedUsers(HashMap<Id, User>);

#[async_trait]
impl UserLookup for FixedUsers {
    async fn find_user(&self, id: Id) -> Result<Option<User>, CampError> {
        Ok(self.0.get(&id).cloned())
    }
}

fn user(id: Id, role: Role, tenant_id: Option<Id>, active: bool) -> User {
    User {
        id,
        tenant_id,
        email: format!("user{id}@camp.example"),
        name: format!("User {id}"),
        role,
        password_hash: String::new(),
        active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

const HQ: Id = 1;
const OWNER: Id = 2;
const COACH: Id = 3;
const PARENT: Id = 4;
const DISABLED: Id = 5;

fn state() -> AppState {
    let config = AppConfig::default();
    let db = Database::connect_lazy(&config.database).unwrap();
    let ctx = ServiceContext::new(
        db.pool().clone(),
        Arc::new(ManualGateway),
        Arc::new(MemoryEmailSender::new()),
        Mailer::from_config(&config.email),
        Arc::new(MemoryStorage::new()),
        ServiceSettings::default(),
    );
    let auth = Arc::new(Authenticator::new(
        &config.auth,
        Arc::new(MemorySessionStore::new()),
    ));

    let users = [
        user(HQ, Role::HqAdmin, None, true),
        user(OWNER, Role::LicenseeOwner, Some(10), true),
        user(COACH, Role::Coach, Some(10), true),
        user(PARENT, Role::Parent, Some(10), true),
        user(DISABLED, Role::Director, Some(10), false),
    ];
    let lookup = FixedUsers(users.into_iter().map(|u| (u.id, u)).collect());
    AppState::new(ctx, auth).with_user_lookup(Arc::new(lookup))
}

struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let state = state();
        let router = router().with_state(state.clone());
        Self { state, router }
    }

    fn bearer(&self, id: Id) -> String {
        let role = match id {
            HQ => Role::HqAdmin,
            OWNER => Role::LicenseeOwner,
            COACH => Role::Coach,
            _ => Role::Parent,
        };
        let current = CurrentUser::from(&user(id, role, Some(10), true));
        let (token, _) = self.state.auth.issue_token(&current).unwrap();
        format!("Bearer {token}")
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str, as_user: Option<Id>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(id) = as_user {
            request = request.header(header::AUTHORIZATION, self.bearer(id));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn post(
        &self,
        uri: &str,
        as_user: Option<Id>,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(id) = as_user {
            request = request.header(header::AUTHORIZATION, self.bearer(id));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = TestApp::new();
    let (status, json) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "authentication required");
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let app = TestApp::new();
    let (status, json) = app.get("/api/auth/me", Some(OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], OWNER);
    assert_eq!(json["role"], "licensee_owner");
    assert_eq!(json["tenant_id"], 10);
}

#[tokio::test]
async fn test_bad_and_disabled_credentials() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app.get("/api/auth/me", Some(DISABLED)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "account is disabled");
}

#[tokio::test]
async fn test_roles_outside_the_matrix_are_forbidden() {
    let app = TestApp::new();
    let tenant = r#"{"name":"North Camps","slug":"north","contact_email":"n@camp.example"}"#;

    let (status, json) = app.post("/api/tenants", Some(PARENT), tenant).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["error"].is_string());

    let (status, _) = app.post("/api/tenants", Some(OWNER), tenant).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/dashboard", Some(COACH)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/analytics", Some(PARENT)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/royalties/invoices", Some(COACH)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/payouts/me", Some(PARENT)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_payloads_are_bad_requests() {
    let app = TestApp::new();

    let (status, json) = app.post("/api/auth/login", None, "{\"email\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, json) = app.get("/api/camps/not-a-number", Some(HQ)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, json) = app
        .get("/api/dashboard?from=2026-01-01", Some(HQ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "from and to must be given together");
}

#[tokio::test]
async fn test_kiosk_lifecycle_without_database() {
    let app = TestApp::new();

    let (status, _) = app.post("/api/kiosks", Some(PARENT), "").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, kiosk) = app.post("/api/kiosks", Some(COACH), "").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(kiosk["state"], "locked");
    assert_eq!(kiosk["tenant_id"], 10);
    let id = kiosk["id"].as_str().unwrap().to_string();

    let (status, fetched) = app.get(&format!("/api/kiosks/{id}"), Some(OWNER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], id.as_str());

    let (status, _) = app
        .post(
            &format!("/api/kiosks/{id}/events"),
            Some(COACH),
            r#"{"event":"next"}"#,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("camp_session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();
    let (status, _) = app.get("/api/nowhere", Some(HQ)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
