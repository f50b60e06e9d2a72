// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use oauth_bridge::config::Config;
use oauth_bridge::db::{ClientRegistry, MemoryStore, UserStore};
use oauth_bridge::error::AppError;
use oauth_bridge::models::{ClientRegistration, Identity, UpstreamToken, UserRecord};
use oauth_bridge::routes::create_router;
use oauth_bridge::services::UpstreamProvider;
use oauth_bridge::AppState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const TEST_CLIENT_ID: &str = "test-client";
pub const TEST_REDIRECT_URI: &str = "https://client.example/callback";
pub const UPSTREAM_AUTHORIZE: &str = "https://upstream.test/authorize";

/// Upstream provider double with call counters.
pub struct FakeUpstream {
    pub exchanges: AtomicUsize,
    pub identity_fetches: AtomicUsize,
    pub fail_exchange: AtomicBool,
    identity: Mutex<Identity>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self {
            exchanges: AtomicUsize::new(0),
            identity_fetches: AtomicUsize::new(0),
            fail_exchange: AtomicBool::new(false),
            identity: Mutex::new(Identity {
                provider_id: 583231,
                login: "octocat".to_string(),
                display_name: "The Octocat".to_string(),
                email: Some("octocat@example.com".to_string()),
                avatar_url: None,
                bio: None,
            }),
        }
    }

    pub fn set_identity(&self, identity: Identity) {
        *self.identity.lock().unwrap() = identity;
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamProvider for FakeUpstream {
    fn authorize_url(&self, state: &str) -> String {
        format!("{}?state={}", UPSTREAM_AUTHORIZE, urlencoding::encode(state))
    }

    async fn exchange_code(&self, code: &str) -> Result<UpstreamToken, AppError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("bad_verification_code".to_string()));
        }
        Ok(UpstreamToken {
            access_token: format!("gho_{}", code),
            scope: "read:user".to_string(),
            expires_at: None,
        })
    }

    async fn fetch_identity(&self, _token: &UpstreamToken) -> Result<Identity, AppError> {
        self.identity_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.identity.lock().unwrap().clone())
    }
}

/// User store whose writes always fail.
pub struct FailingUserStore;

#[async_trait]
impl UserStore for FailingUserStore {
    async fn upsert_user(&self, _identity: &Identity) -> Result<UserRecord, AppError> {
        Err(AppError::Database("write rejected".to_string()))
    }
}

/// Router plus handles on its collaborators.
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub upstream: Arc<FakeUpstream>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Create a test app with in-memory storage, a fake upstream and one
/// registered client.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default()).await
}

pub async fn create_test_app_with_config(config: Config) -> TestApp {
    build_test_app(config, None).await
}

/// Test app whose user store rejects every upsert. Clients and grants still
/// live in the returned `store`.
pub async fn create_test_app_with_failing_users() -> TestApp {
    build_test_app(Config::test_default(), Some(Arc::new(FailingUserStore))).await
}

async fn build_test_app(config: Config, users: Option<Arc<dyn UserStore>>) -> TestApp {
    let store = MemoryStore::new();
    store
        .register_client(&ClientRegistration {
            client_id: TEST_CLIENT_ID.to_string(),
            redirect_uris: [TEST_REDIRECT_URI.to_string()].into(),
            client_name: "Test Tool".to_string(),
            metadata: Default::default(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
        .await
        .unwrap();

    let upstream = Arc::new(FakeUpstream::new());
    let shared = Arc::new(store.clone());
    let users: Arc<dyn UserStore> = users.unwrap_or_else(|| shared.clone() as Arc<dyn UserStore>);
    let state = Arc::new(
        AppState::new(config, shared.clone(), users, shared, upstream.clone()).unwrap(),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        upstream,
    }
}

// ─── Response helpers ────────────────────────────────────────

pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

pub fn find_cookie(headers: &[String], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
}

/// `name=value` part of a Set-Cookie header, suitable for a Cookie header.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|kv| {
        let (k, v) = kv.split_once('=')?;
        (k == name).then(|| urlencoding::decode(v).unwrap().into_owned())
    })
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Hidden `flow` field of a rendered consent page.
pub fn consent_flow(html: &str) -> String {
    let marker = r#"name="flow" value=""#;
    let start = html.find(marker).expect("consent form without flow field") + marker.len();
    let end = html[start..].find('"').unwrap() + start;
    html[start..end].to_string()
}

// ─── Request helpers ─────────────────────────────────────────

pub fn authorize_uri(scope: &str, client_state: &str) -> String {
    format!(
        "/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        TEST_CLIENT_ID,
        urlencoding::encode(TEST_REDIRECT_URI),
        urlencoding::encode(scope),
        urlencoding::encode(client_state)
    )
}

pub fn get(uri: &str, cookies: &[String]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, form: &[(&str, &str)], cookies: &[String]) -> Request<Body> {
    let body = form
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if !cookies.is_empty() {
        builder = builder.header(header::COOKIE, cookies.join("; "));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Outcome of a consent + upstream round trip.
pub struct FlowOutcome {
    /// Downstream authorization code delivered to the client
    pub code: String,
    /// Client redirect the browser ended on
    pub client_redirect: String,
    /// `name=value` of the approval cookie
    pub approval_cookie: String,
}

/// Drive scenario A: consent, approval, upstream round trip, callback.
pub async fn complete_flow(app: &TestApp, authorize: &str) -> FlowOutcome {
    let consent = app.send(get(authorize, &[])).await;
    assert_eq!(consent.status(), StatusCode::OK);
    let consent_cookie = cookie_pair(
        &find_cookie(&set_cookie_headers(&consent), "bridge_consent")
            .expect("consent cookie"),
    );
    let flow = consent_flow(&body_string(consent).await);

    let approved = app
        .send(post_form(
            "/authorize",
            &[("flow", &flow), ("decision", "approve")],
            &[consent_cookie],
        ))
        .await;
    assert_eq!(approved.status(), StatusCode::FOUND);
    let cookies = set_cookie_headers(&approved);
    let approval_cookie =
        cookie_pair(&find_cookie(&cookies, "bridge_approval").expect("approval cookie"));
    let nonce_cookie =
        cookie_pair(&find_cookie(&cookies, "bridge_oauth_nonce").expect("nonce cookie"));
    let upstream_url = location(&approved);
    let upstream_state = query_param(&upstream_url, "state").unwrap();

    let callback = app
        .send(get(
            &format!(
                "/callback?code=ABC&state={}",
                urlencoding::encode(&upstream_state)
            ),
            &[nonce_cookie],
        ))
        .await;
    assert_eq!(callback.status(), StatusCode::FOUND);
    let client_redirect = location(&callback);
    let code = query_param(&client_redirect, "code").expect("code on client redirect");

    FlowOutcome {
        code,
        client_redirect,
        approval_cookie,
    }
}
