//! `GET /health`: liveness plus what the front page has to work with

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use clay_syncr::flickr::models::count_photos;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database cannot be queried
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
}

#[derive(Debug, Default, Serialize)]
pub struct DatabaseHealth {
    pub reachable: bool,
    /// Flickr photos available to the front page grid
    pub synced_photos: i64,
    pub live_cache_entries: i64,
}

async fn database_health(state: &AppState) -> clay_syncr::Result<DatabaseHealth> {
    Ok(DatabaseHealth {
        reachable: true,
        synced_photos: count_photos(&state.db).await?,
        live_cache_entries: state.cache.live_entries().await?,
    })
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, database) = match database_health(&state).await {
        Ok(database) => ("ok", StatusCode::OK, database),
        Err(e) => {
            warn!(error = %e, "Health check cannot reach the database");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, DatabaseHealth::default())
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            module: "clay-web",
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
