use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{models::ApiResponse, AppState};

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub db_ok: bool,
    pub notifications_enabled: bool,
}

/// GET /api/health — liveness probe with a storage round-trip.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthStatus>> {
    let db_ok = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    Json(ApiResponse::success(HealthStatus {
        status: if db_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        db_ok,
        notifications_enabled: !state.bot_token.is_empty(),
    }))
}
