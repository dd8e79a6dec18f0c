/// Health check endpoint
///
/// Provides a simple health check endpoint that verifies:
/// - The server is running
/// - Store connectivity
/// - The program component is installed
///
/// Backends with a connection pool also report its usage.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "program": "installed",
///   "connections": {
///     "active_connections": 1,
///     "idle_connections": 4,
///     "total_connections": 5
///   }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use usersetfeed_shared::db::pool::PoolStats;
use usersetfeed_shared::store::HostStore;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Program component status
    pub program: String,

    /// Connection pool usage, absent for unpooled stores
    pub connections: Option<PoolStats>,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = state.store.ping().await.is_ok();
    let installed = connected && state.store.program_installed().await.unwrap_or(false);

    Ok(Json(HealthResponse {
        status: if connected && installed {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        program: if installed { "installed" } else { "missing" }.to_string(),
        connections: state.store.pool_stats(),
    }))
}
