use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use super::{ApiResponse, WebError};
use crate::context::AppContext;
use crate::models::Snapshot;
use crate::scheduler::ScanStats;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub database: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub page_url: String,
    pub scan_interval_secs: u64,
    pub uptime_seconds: u64,
    pub products: usize,
    pub subscribers: i64,
    pub scanner: ScanStats,
}

pub async fn health_check(State(context): State<AppContext>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(context.database.pool()).await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("Health check database probe failed: {}", e);
            "unhealthy"
        }
    };

    Json(HealthResponse {
        status: if database == "healthy" { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}

pub async fn list_products(
    State(context): State<AppContext>,
) -> Result<Json<ApiResponse<Snapshot>>, WebError> {
    let snapshot = context.snapshots.load().await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn scanner_status(
    State(context): State<AppContext>,
) -> Result<Json<ApiResponse<StatusResponse>>, WebError> {
    let products = context.snapshots.load().await?.len();
    let subscribers = context.subscribers.count().await?;
    let scanner = context.scan_stats.read().await.clone();

    Ok(Json(ApiResponse::success(StatusResponse {
        page_url: context.config.scraper.url.clone(),
        scan_interval_secs: context.config.scheduler.scan_interval_secs,
        uptime_seconds: scanner.uptime_seconds(),
        products,
        subscribers,
        scanner,
    })))
}
