use std::sync::Arc;

use anyhow::Context;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use tour_pricing::config::AppConfig;
use tour_pricing::pricing::queries::PgPriceStore;
use tour_pricing::pricing::{router, MemoryRemoteStore, RemoteStore};
use tour_pricing::{init_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env().context("Failed to load config")?;

    let (store, backend): (Arc<dyn RemoteStore>, &'static str) = match &config.database_url {
        Some(url) => {
            let store = PgPriceStore::connect(url)
                .await
                .context("Failed to connect to database")?;
            store
                .ensure_schema()
                .await
                .context("Failed to create price_configs table")?;
            (Arc::new(store), "postgres")
        }
        None => {
            tracing::warn!("DATABASE_URL not set, price records are kept in memory only");
            (Arc::new(MemoryRemoteStore::new()), "memory")
        }
    };

    let app = router(AppState { store, backend })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Price store listening on {} ({} backend)", config.bind_addr, backend);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
