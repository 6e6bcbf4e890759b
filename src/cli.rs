//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::ServerConfig;
use crate::chatbot::ChatbotConfig;
use crate::db::Database;
use crate::jwt::{MIN_JWT_SECRET_LENGTH, parse_duration};
use crate::notify::LogNotifier;
use crate::origin::DEFAULT_ALLOWED_ORIGINS;
use crate::recommend::{DEFAULT_ENGINE_TIMEOUT, RecommenderConfig};

/// Minimum length of a configured session signing secret.
const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// Size of the session signing key generated outside production.
const GENERATED_SESSION_SECRET_BYTES: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Deployment mode. Controls origin leniency, cookie flags and error detail.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Development,
    Test,
    Production,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Mountify", about = "Hiking and mountain information backend")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "mountify.db")]
    pub database: String,

    /// Path to file containing the JWT secret. Prefer JWT_SECRET_KEY instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime, e.g. "1d", "12h", "30m"
    #[arg(long, env = "JWT_EXPIRES_IN", default_value = "1d", value_parser = parse_duration)]
    pub jwt_expires_in: u64,

    /// Path to file containing the session cookie signing secret. Prefer CSRF_SESSION_SECRET instead
    #[arg(long)]
    pub session_secret_file: Option<String>,

    /// Comma separated origins allowed to call the API
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Deployment mode
    #[arg(short, long, env = "APP_ENV", default_value = "development")]
    pub mode: RunMode,

    /// Log output format
    #[arg(short, long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Use the first X-Forwarded-For entry as the client IP (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Interpreter used to run the recommendation engine
    #[arg(long, env = "RECOMMENDER_COMMAND", default_value = "python")]
    pub recommender_command: String,

    /// Recommendation engine script
    #[arg(
        long,
        env = "RECOMMENDER_SCRIPT",
        default_value = "rekomendasi_api/fuzzy_engine.py"
    )]
    pub recommender_script: String,

    /// Intent-detection endpoint for the chatbot proxy (disabled when unset)
    #[arg(long, env = "CHATBOT_ENDPOINT")]
    pub chatbot_endpoint: Option<Url>,

    /// Frontend base URL used in password reset links
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,
}

/// Startup configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "JWT secret is required. Set JWT_SECRET_KEY environment variable (recommended) or use --jwt-secret-file"
    )]
    MissingJwtSecret,
    #[error("Session secret is required in production. Set CSRF_SESSION_SECRET or use --session-secret-file")]
    MissingSessionSecret,
    #[error("{name} is shorter than {min} characters. Use a longer secret")]
    SecretTooShort { name: &'static str, min: usize },
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid allowed origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },
    #[error("Invalid frontend URL {0:?}")]
    InvalidFrontendUrl(String),
}

/// Initialize logging based on the specified format. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Read a secret from an environment variable (cleared after reading) or a file.
fn read_secret(env_name: &str, file: Option<&str>) -> Result<Option<String>, ConfigError> {
    if let Ok(secret) = std::env::var(env_name) {
        // SAFETY: called during single-threaded startup before the runtime
        // spawns workers; nothing else reads this variable.
        unsafe { std::env::remove_var(env_name) };
        return Ok(Some(secret.trim().to_string()));
    }
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map(|content| Some(content.trim().to_string()))
            .map_err(|source| ConfigError::ReadFile {
                path: path.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Load the JWT secret from `JWT_SECRET_KEY` or a file.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Result<String, ConfigError> {
    let secret = read_secret("JWT_SECRET_KEY", jwt_secret_file)?
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingJwtSecret)?;

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::SecretTooShort {
            name: "JWT secret",
            min: MIN_JWT_SECRET_LENGTH,
        });
    }
    Ok(secret)
}

/// Load the session cookie signing key from `CSRF_SESSION_SECRET` or a file.
///
/// Outside production a random key is generated when none is configured, so
/// sessions do not survive a restart.
pub fn load_session_secret(
    session_secret_file: Option<&str>,
    mode: RunMode,
) -> Result<Vec<u8>, ConfigError> {
    match read_secret("CSRF_SESSION_SECRET", session_secret_file)?.filter(|s| !s.is_empty()) {
        Some(secret) if secret.len() < MIN_SESSION_SECRET_LENGTH => {
            Err(ConfigError::SecretTooShort {
                name: "Session secret",
                min: MIN_SESSION_SECRET_LENGTH,
            })
        }
        Some(secret) => Ok(secret.into_bytes()),
        None if mode == RunMode::Production => Err(ConfigError::MissingSessionSecret),
        None => {
            info!("No session secret configured, generating a random one");
            let mut key = vec![0u8; GENERATED_SESSION_SECRET_BYTES];
            rand::rng().fill(key.as_mut_slice());
            Ok(key)
        }
    }
}

/// Validate configured origins. An empty list selects the local development defaults.
pub fn validate_origins(origins: &[String]) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<&str> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() {
        return Ok(DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|o| o.to_string())
            .collect());
    }

    origins
        .into_iter()
        .map(|origin| {
            let invalid = |reason: &str| ConfigError::InvalidOrigin {
                origin: origin.to_string(),
                reason: reason.to_string(),
            };
            let url = Url::parse(origin).map_err(|e| invalid(&e.to_string()))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(invalid("scheme must be http or https"));
            }
            if url.host_str().is_none() {
                return Err(invalid("missing host"));
            }
            if origin.ends_with('/') || url.path() != "/" || url.query().is_some() {
                return Err(invalid("origin must not contain a path"));
            }
            Ok(origin.to_string())
        })
        .collect()
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
    session_secret: Vec<u8>,
) -> Result<ServerConfig, ConfigError> {
    let allowed_origins = validate_origins(&args.allowed_origins)?;

    let frontend_url = args.frontend_url.trim_end_matches('/').to_string();
    if Url::parse(&frontend_url).is_err() {
        return Err(ConfigError::InvalidFrontendUrl(args.frontend_url.clone()));
    }

    let chatbot = args.chatbot_endpoint.clone().map(|endpoint| ChatbotConfig {
        endpoint,
        token: std::env::var("CHATBOT_TOKEN").ok().filter(|t| !t.is_empty()),
        timeout: Duration::from_secs(10),
    });

    Ok(ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        jwt_expires_in: args.jwt_expires_in,
        session_secret,
        mode: args.mode,
        secure_cookies: args.mode != RunMode::Development,
        allowed_origins,
        trust_forwarded_for: args.trust_forwarded_for,
        recommender: RecommenderConfig {
            command: args.recommender_command.clone(),
            script: args.recommender_script.clone().into(),
            timeout: DEFAULT_ENGINE_TIMEOUT,
        },
        chatbot,
        frontend_url,
        reset_notifier: Arc::new(LogNotifier),
    })
}

/// Open the database.
pub async fn open_database(path: &str) -> Result<Database, sqlx::Error> {
    let db = Database::open(path).await?;
    info!(path = %path, "Database opened");
    Ok(db)
}
