use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::state::SharedState;
use crate::types::HealthResponse;

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = u64::try_from((Utc::now() - state.started_at).num_seconds()).unwrap_or(0);

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        sync: state.service.sync_stats(),
    })
}
