use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_pluggy_sync::config::Config;
use rust_pluggy_sync::db::Database;
use rust_pluggy_sync::handlers::AppState;
use rust_pluggy_sync::pluggy_client::PluggyClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_pluggy_sync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Provider client is optional: without credentials the service still
    // serves stored data and acks webhooks, it just cannot sync.
    let pluggy = if config.has_provider_credentials() {
        match PluggyClient::new(
            config.pluggy_base_url.clone(),
            config.pluggy_client_id.clone().unwrap_or_default(),
            config.pluggy_client_secret.clone().unwrap_or_default(),
        ) {
            Ok(client) => {
                tracing::info!("Pluggy client initialized: {}", config.pluggy_base_url);
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize Pluggy client: {}", e);
                None
            }
        }
    } else {
        None
    };

    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config: config.clone(),
        pluggy,
    });

    let app = rust_pluggy_sync::app_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
