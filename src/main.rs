//! PrimeJourney Accounts server binary.
//!
//! Loads configuration from the environment, connects to Postgres,
//! applies migrations and serves the account API.

use primejourney_accounts::config::AppConfig;
use primejourney_accounts::db;
use primejourney_accounts::handlers;
use primejourney_accounts::service::AuthService;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("primejourney_accounts=info,tower_http=info")
        }))
        .init();

    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        debug = config.debug,
        issuer = %config.jwt_issuer,
        "Starting PrimeJourney accounts server"
    );

    let db = db::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&db)
        .await
        .expect("Failed to run database migrations");

    let bind_addr = config.bind_addr.clone();
    let auth_service = Arc::new(AuthService::new(db, config));
    let app = handlers::create_router(auth_service);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind server address");
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
