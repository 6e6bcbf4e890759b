#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use mountify::{
    ServerConfig, create_app,
    cli::RunMode,
    db::{Database, NewUser, UserRole},
    jwt::JwtConfig,
    notify::PasswordResetNotifier,
    password,
    recommend::{DEFAULT_ENGINE_TIMEOUT, RecommenderConfig},
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"integration-test-jwt-secret-0123456789";
pub const SESSION_SECRET: &[u8] = b"integration-test-session-secret-0123456789";
pub const TEST_PASSWORD: &str = "password123";
pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Records reset links instead of delivering them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn last_link(&self) -> Option<(String, String)> {
        self.sent.lock().unwrap().last().cloned()
    }
}

impl PasswordResetNotifier for RecordingNotifier {
    fn send_reset_link(&self, email: &str, link: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), link.to_string()));
    }
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
    pub notifier: Arc<RecordingNotifier>,
}

/// Build a config around a fresh in-memory database.
pub async fn test_config() -> (ServerConfig, Arc<RecordingNotifier>) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let notifier = Arc::new(RecordingNotifier::default());
    let config = ServerConfig {
        db,
        jwt_secret: JWT_SECRET.to_vec(),
        jwt_expires_in: 3600,
        session_secret: SESSION_SECRET.to_vec(),
        mode: RunMode::Test,
        secure_cookies: false,
        allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
        trust_forwarded_for: false,
        recommender: RecommenderConfig {
            command: "sh".to_string(),
            script: fixture("fake_engine.sh"),
            timeout: DEFAULT_ENGINE_TIMEOUT,
        },
        chatbot: None,
        frontend_url: "http://localhost:3000".to_string(),
        reset_notifier: notifier.clone(),
    };
    (config, notifier)
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

pub async fn test_app_with(customize: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let (mut config, notifier) = test_config().await;
    customize(&mut config);
    TestApp {
        app: create_app(&config),
        db: config.db.clone(),
        jwt: JwtConfig::new(&config.jwt_secret, config.jwt_expires_in),
        notifier,
    }
}

impl TestApp {
    /// Insert an active user with [`TEST_PASSWORD`].
    pub async fn create_user(&self, username: &str, role: UserRole) -> i64 {
        let hash = password::hash(TEST_PASSWORD).unwrap();
        let email = format!("{}@example.com", username);
        self.db
            .users()
            .create(&NewUser {
                full_name: &format!("{} Test", username),
                username,
                email: &email,
                password_hash: &hash,
                role,
                domicile: None,
                institution: None,
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, id: i64, username: &str, role: UserRole) -> String {
        self.jwt
            .generate_access_token(id, &format!("{}@example.com", username), role)
            .unwrap()
            .token
    }

    /// Create a user and return `(id, bearer token)`.
    pub async fn user_with_token(&self, username: &str, role: UserRole) -> (i64, String) {
        let id = self.create_user(username, role).await;
        (id, self.token_for(id, username, role))
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(&self.app, request).await
    }

    /// Bootstrap an anti-forgery session.
    pub async fn csrf_session(&self) -> CsrfSession {
        let response = self.send(Req::get("/api/csrf-token").empty()).await;
        assert_eq!(response.status, StatusCode::OK);
        let cookie = response
            .set_cookie()
            .expect("csrf-token must set the session cookie");
        let token = response.body["csrfToken"]
            .as_str()
            .expect("csrfToken in body")
            .to_string();
        CsrfSession { cookie, token }
    }
}

/// Cookie pair (`name=value`) and token of an anti-forgery session.
#[derive(Clone, Debug)]
pub struct CsrfSession {
    pub cookie: String,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` part of the first `Set-Cookie` header.
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Small request builder for oneshot tests.
pub struct Req(axum::http::request::Builder);

impl Req {
    pub fn new(method: &str, uri: &str) -> Self {
        Self(Request::builder().method(method).uri(uri))
    }

    pub fn get(uri: &str) -> Self {
        Self::new("GET", uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new("POST", uri)
    }

    pub fn put(uri: &str) -> Self {
        Self::new("PUT", uri)
    }

    pub fn patch(uri: &str) -> Self {
        Self::new("PATCH", uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new("DELETE", uri)
    }

    pub fn header(self, name: &str, value: &str) -> Self {
        Self(self.0.header(name, value))
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {}", token))
    }

    pub fn cookie(self, cookie: &str) -> Self {
        self.header("cookie", cookie)
    }

    /// Session cookie plus `X-CSRF-Token`.
    pub fn csrf(self, session: &CsrfSession) -> Self {
        self.cookie(&session.cookie)
            .header("x-csrf-token", &session.token)
    }

    pub fn json(self, body: Value) -> Request<Body> {
        self.0
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn empty(self) -> Request<Body> {
        self.0.body(Body::empty()).unwrap()
    }
}
