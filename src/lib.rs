pub mod api;
pub mod auth;
pub mod chatbot;
pub mod cleanup;
pub mod cli;
pub mod csrf;
pub mod db;
pub mod jwt;
pub mod notify;
pub mod origin;
pub mod password;
pub mod rate_limit;
pub mod recommend;
pub mod uploads;

use api::{ApiContext, HealthState, create_api_router, expose_error_detail, health, not_found};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::get,
};
use chatbot::{ChatbotClient, ChatbotConfig};
use cli::RunMode;
use csrf::SessionManager;
use db::Database;
use jwt::JwtConfig;
use notify::PasswordResetNotifier;
use origin::{OriginPolicy, origin_gate};
use rate_limit::RateLimitConfig;
use recommend::{Recommender, RecommenderConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing bearer and reset tokens
    pub jwt_secret: Vec<u8>,
    /// Bearer token lifetime in seconds
    pub jwt_expires_in: u64,
    /// Key for signing the session cookie
    pub session_secret: Vec<u8>,
    pub mode: RunMode,
    /// Whether to set Secure flag on cookies
    pub secure_cookies: bool,
    /// Origins allowed to call the API from a browser
    pub allowed_origins: Vec<String>,
    /// Take the client IP from `X-Forwarded-For` (requires running behind a proxy)
    pub trust_forwarded_for: bool,
    pub recommender: RecommenderConfig,
    /// Intent-detection service; the chatbot proxy is disabled when `None`
    pub chatbot: Option<ChatbotConfig>,
    /// Base URL used in password reset links
    pub frontend_url: String,
    pub reset_notifier: Arc<dyn PasswordResetNotifier>,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("x-xsrf-token"),
        ])
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret, config.jwt_expires_in));
    let sessions = SessionManager::new(
        config.db.clone(),
        &config.session_secret,
        config.secure_cookies,
    );

    let chatbot = config
        .chatbot
        .clone()
        .and_then(|chatbot| match ChatbotClient::new(chatbot) {
            Ok(client) => Some(client),
            Err(e) => {
                error!(error = %e, "Chatbot client unavailable");
                None
            }
        });
    if chatbot.is_none() {
        warn!("No chatbot endpoint configured, intent detection is disabled");
    }

    let started_at = Instant::now();
    let api_router = create_api_router(ApiContext {
        db: config.db.clone(),
        jwt,
        sessions,
        rate_limits: Arc::new(RateLimitConfig::new(config.trust_forwarded_for)),
        recommender: Recommender::new(config.recommender.clone()),
        chatbot,
        frontend_url: Arc::from(config.frontend_url.as_str()),
        reset_notifier: config.reset_notifier.clone(),
        started_at,
    });

    let policy = Arc::new(OriginPolicy::new(
        config.allowed_origins.clone(),
        config.mode,
    ));

    Router::new()
        .route("/health", get(health).with_state(HealthState { started_at }))
        .nest("/api", api_router)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(policy, origin_gate))
                .layer(cors_layer(&config.allowed_origins))
                .layer(middleware::from_fn_with_state(
                    config.mode,
                    expose_error_detail,
                )),
        )
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener until `shutdown` resolves.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(
    config: ServerConfig,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener, std::future::pending()).await {
            error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
