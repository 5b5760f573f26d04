use std::sync::Arc;

use household_insights::{
    api::{create_router, AppState},
    clock::SystemClock,
    config::Config,
    db::{create_pool, MemoryStore, PgStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "household_insights=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let clock = Arc::new(SystemClock);

    let state = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url, config.database_max_connections).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            tracing::info!("Using PostgreSQL storage");
            AppState::new(store, clock)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on exit");
            AppState::new(MemoryStore::new(), clock)
        }
    };

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
