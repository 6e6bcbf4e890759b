use clap::Parser;
use mountify::cli::{
    Args, build_config, init_logging, load_jwt_secret, load_session_secret, open_database,
};
use mountify::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments set the environment directly.
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_format);

    let jwt_secret = load_jwt_secret(args.jwt_secret_file.as_deref()).unwrap_or_else(|e| {
        error!(error = %e, "Invalid JWT secret");
        std::process::exit(1);
    });

    let session_secret = load_session_secret(args.session_secret_file.as_deref(), args.mode)
        .unwrap_or_else(|e| {
            error!(error = %e, "Invalid session secret");
            std::process::exit(1);
        });

    let db = open_database(&args.database).await.unwrap_or_else(|e| {
        error!(path = %args.database, error = %e, "Failed to open database");
        std::process::exit(1);
    });

    let config = build_config(&args, db, jwt_secret, session_secret).unwrap_or_else(|e| {
        error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    init_cleanup(&config.db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, mode = ?args.mode, "Listening"),
        Err(e) => info!(address = %addr, error = %e, "Listening"),
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutting down");
    };

    if let Err(e) = run_server(config, listener, shutdown).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
