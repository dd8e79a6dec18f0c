//! # User Set Feed API Server
//!
//! Serves the `userset_create` web service function over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p usersetfeed-api
//! ```

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usersetfeed_api::app::{build_router, AppState};
use usersetfeed_api::config::Config;
use usersetfeed_shared::db::migrations::{get_migration_status, run_migrations};
use usersetfeed_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use usersetfeed_shared::store::postgres::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "usersetfeed_api=debug,usersetfeed_shared=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "User set feed API server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }
    let migrations = get_migration_status(&pool).await?;
    tracing::info!(
        applied = migrations.applied_migrations,
        latest = ?migrations.latest_version,
        "Database schema ready"
    );

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received, exiting...");
        })
        .await?;

    close_pool(pool).await;

    Ok(())
}
